//! Background process that turns due recurring payments into ledger records.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::NaiveDateTime;

use crate::{
    core::{services::PaymentRegistry, time::Clock},
    errors::Result,
    ledger::{
        compute_next, compute_next_after, RecurringOrigin, RecurringPayment, TransactionLedger,
        TransactionRecord,
    },
};

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fired: usize,
    /// Occurrences already in the ledger whose schedule only needed advancing.
    pub deduplicated: usize,
    /// Active payments that had no next occurrence and got one.
    pub healed: usize,
    pub failures: usize,
    /// Another tick was still running, so this one did nothing.
    pub skipped: bool,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

enum Firing {
    Appended,
    AlreadyRecorded,
}

pub struct SchedulerLoop {
    registry: Arc<PaymentRegistry>,
    ledger: Arc<TransactionLedger>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    in_progress: AtomicBool,
}

struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SchedulerLoop {
    pub fn new(
        registry: Arc<PaymentRegistry>,
        ledger: Arc<TransactionLedger>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            ledger,
            clock,
            poll_interval,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Fires every active payment due at the clock's current time.
    ///
    /// A payment that fails keeps its next occurrence and is retried on the
    /// following tick; the others are unaffected.
    pub fn tick(&self) -> TickReport {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("previous tick still running, skipping");
            return TickReport::skipped();
        }
        let _guard = TickGuard(&self.in_progress);

        let now = self.clock.now();
        let mut report = TickReport::default();
        let payments = match self.registry.list_active() {
            Ok(payments) => payments,
            Err(err) => {
                tracing::warn!(error = %err, "could not load recurring payments");
                report.failures += 1;
                return report;
            }
        };

        for payment in payments {
            match payment.next_occurrence_at {
                None => match self.heal(&payment, now) {
                    Ok(()) => report.healed += 1,
                    Err(err) => {
                        tracing::warn!(payment = %payment.id, error = %err, "could not compute next occurrence");
                        report.failures += 1;
                    }
                },
                Some(scheduled_for) if scheduled_for <= now => {
                    match self.fire(&payment, scheduled_for, now) {
                        Ok(Firing::Appended) => report.fired += 1,
                        Ok(Firing::AlreadyRecorded) => report.deduplicated += 1,
                        Err(err) => {
                            tracing::warn!(
                                payment = %payment.id,
                                %scheduled_for,
                                transient = err.is_transient(),
                                error = %err,
                                "recurring payment failed, will retry next tick"
                            );
                            report.failures += 1;
                        }
                    }
                }
                Some(_) => {}
            }
        }

        if report.fired + report.deduplicated + report.healed + report.failures > 0 {
            tracing::info!(
                fired = report.fired,
                deduplicated = report.deduplicated,
                healed = report.healed,
                failures = report.failures,
                "scheduler tick finished"
            );
        }
        report
    }

    fn fire(
        &self,
        payment: &RecurringPayment,
        scheduled_for: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Firing> {
        let origin = RecurringOrigin {
            payment_id: payment.id,
            scheduled_for,
        };
        let outcome = if self.ledger.contains_occurrence(&origin)? {
            Firing::AlreadyRecorded
        } else {
            let record = self
                .ledger
                .append(TransactionRecord::from_recurring(payment, scheduled_for, now))?;
            tracing::info!(
                payment = %payment.id,
                transaction = %record.id,
                amount = %record.amount,
                "recurring payment fired"
            );
            Firing::Appended
        };
        let next = compute_next_after(&payment.schedule, scheduled_for, now)?;
        self.registry.record_advance(payment, next)?;
        Ok(outcome)
    }

    fn heal(&self, payment: &RecurringPayment, now: NaiveDateTime) -> Result<()> {
        let next = compute_next(&payment.schedule, now)?;
        self.registry.record_advance(payment, next)?;
        tracing::debug!(payment = %payment.id, %next, "next occurrence restored");
        Ok(())
    }

    /// Runs ticks on a background thread until the returned handle is stopped.
    pub fn spawn(self: Arc<Self>) -> Result<SchedulerHandle> {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);
        let thread = thread::Builder::new()
            .name("ops-ledger-scheduler".into())
            .spawn(move || self.run(&thread_signal))?;
        tracing::info!("scheduler started");
        Ok(SchedulerHandle {
            signal,
            thread: Some(thread),
        })
    }

    fn run(&self, signal: &(Mutex<bool>, Condvar)) {
        let (stopped, wake) = signal;
        loop {
            self.tick();
            let guard = match stopped.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let waited = wake.wait_timeout_while(guard, self.poll_interval, |stop| !*stop);
            match waited {
                Ok((guard, _)) if !*guard => continue,
                _ => break,
            }
        }
        tracing::info!("scheduler stopped");
    }
}

/// Owner of the background scheduler thread.
pub struct SchedulerHandle {
    signal: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Wakes the loop, asks it to exit and waits for the thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (stopped, wake) = &*self.signal;
        if let Ok(mut flag) = stopped.lock() {
            *flag = true;
        }
        wake.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
