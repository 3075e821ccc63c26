//! CRUD access to recurring payment definitions.

use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    core::time::Clock,
    errors::{LedgerError, Result},
    ledger::{compute_next, PaymentDraft, PaymentStatus, RecurringPayment, Schedule},
    storage::PaymentStore,
};

/// Validated accessor over an injected [`PaymentStore`].
pub struct PaymentRegistry {
    store: Arc<dyn PaymentStore>,
    clock: Arc<dyn Clock>,
}

impl PaymentRegistry {
    pub fn new(store: Arc<dyn PaymentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn list_all(&self) -> Result<Vec<RecurringPayment>> {
        self.store.load_payments()
    }

    pub fn list_active(&self) -> Result<Vec<RecurringPayment>> {
        Ok(self
            .store
            .load_payments()?
            .into_iter()
            .filter(RecurringPayment::is_active)
            .collect())
    }

    pub fn get(&self, id: Uuid) -> Result<RecurringPayment> {
        self.store
            .find_payment(id)?
            .ok_or(LedgerError::PaymentNotFound(id))
    }

    /// Validates and stores `payment`, filling a missing next occurrence for active payments.
    pub fn upsert(&self, mut payment: RecurringPayment) -> Result<RecurringPayment> {
        payment.validate()?;
        let now = self.clock.now();
        if payment.is_active() && payment.next_occurrence_at.is_none() {
            payment.next_occurrence_at = Some(compute_next(&payment.schedule, now)?);
        }
        payment.updated_at = now;
        self.store.save_payment(&payment)?;
        Ok(payment)
    }

    pub fn create(&self, draft: PaymentDraft) -> Result<RecurringPayment> {
        let payment = RecurringPayment::from_draft(draft, self.clock.now());
        let payment = self.upsert(payment)?;
        tracing::info!(
            payment = %payment.id,
            schedule = %payment.schedule.label(),
            "recurring payment created"
        );
        Ok(payment)
    }

    pub fn remove(&self, id: Uuid) -> Result<()> {
        if self.store.delete_payment(id)? {
            Ok(())
        } else {
            Err(LedgerError::PaymentNotFound(id))
        }
    }

    /// Replaces the schedule; the next occurrence is recomputed from now.
    pub fn reschedule(&self, id: Uuid, schedule: Schedule) -> Result<RecurringPayment> {
        schedule.validate()?;
        let mut payment = self.get(id)?;
        payment.schedule = schedule;
        payment.next_occurrence_at = None;
        self.upsert(payment)
    }

    /// Pauses or resumes. Resuming never fires the occurrences missed while paused.
    pub fn set_status(&self, id: Uuid, status: PaymentStatus) -> Result<RecurringPayment> {
        let mut payment = self.get(id)?;
        if payment.status == status {
            return Ok(payment);
        }
        payment.status = status;
        if status == PaymentStatus::Active {
            payment.next_occurrence_at = None;
        }
        let payment = self.upsert(payment)?;
        tracing::info!(payment = %payment.id, %status, "recurring payment status changed");
        Ok(payment)
    }

    /// Persists the schedule position after a firing or a heal.
    pub fn record_advance(
        &self,
        payment: &RecurringPayment,
        next: NaiveDateTime,
    ) -> Result<RecurringPayment> {
        let mut advanced = payment.clone();
        advanced.next_occurrence_at = Some(next);
        advanced.updated_at = self.clock.now();
        self.store.save_payment(&advanced)?;
        Ok(advanced)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use super::*;
    use crate::core::time::ManualClock;
    use crate::currency::CurrencyCode;
    use crate::ledger::{Cadence, OperationKind};
    use crate::storage::InMemoryStore;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn registry() -> (PaymentRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        (
            PaymentRegistry::new(Arc::new(InMemoryStore::new()), clock.clone()),
            clock,
        )
    }

    fn draft(amount: Decimal) -> PaymentDraft {
        PaymentDraft {
            category: "Rent".into(),
            subcategory: None,
            description: "Office rent".into(),
            account_id: Uuid::new_v4(),
            currency: CurrencyCode::new("USD"),
            operation: OperationKind::Withdraw,
            amount,
            schedule: Schedule::new(
                Cadence::Monthly { day: 15 },
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ),
        }
    }

    #[test]
    fn create_computes_next_occurrence() {
        let (registry, _) = registry();
        let payment = registry.create(draft(Decimal::new(500, 0))).unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 4, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(payment.next_occurrence_at, Some(expected));
        assert_eq!(registry.list_active().unwrap().len(), 1);
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let (registry, _) = registry();
        let err = registry.create(draft(Decimal::ZERO)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(registry.list_all().unwrap().is_empty());
    }

    #[test]
    fn missing_ids_surface_not_found() {
        let (registry, _) = registry();
        let id = Uuid::new_v4();
        assert!(matches!(registry.get(id), Err(LedgerError::PaymentNotFound(found)) if found == id));
        assert!(matches!(registry.remove(id), Err(LedgerError::PaymentNotFound(_))));
    }

    #[test]
    fn resume_recomputes_from_now() {
        let (registry, clock) = registry();
        let payment = registry.create(draft(Decimal::ONE)).unwrap();
        registry.set_status(payment.id, PaymentStatus::Paused).unwrap();
        assert!(registry.list_active().unwrap().is_empty());

        clock.set(
            NaiveDate::from_ymd_opt(2025, 7, 20)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );
        let resumed = registry.set_status(payment.id, PaymentStatus::Active).unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(resumed.next_occurrence_at, Some(expected));
    }

    #[test]
    fn reschedule_replaces_next_occurrence() {
        let (registry, _) = registry();
        let payment = registry.create(draft(Decimal::ONE)).unwrap();
        let daily = Schedule::new(Cadence::Daily, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        let updated = registry.reschedule(payment.id, daily).unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 4, 3)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        assert_eq!(updated.next_occurrence_at, Some(expected));

        let invalid = Schedule::new(Cadence::Weekly { weekday: 9 }, NaiveTime::MIN);
        assert!(registry.reschedule(payment.id, invalid).is_err());
    }
}
