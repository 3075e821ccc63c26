//! Next-occurrence arithmetic for recurring payment schedules.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use super::recurring::{Cadence, Schedule};
use crate::errors::{LedgerError, Result};

const MAX_CATCH_UP_STEPS: usize = 4096;

/// Returns the first firing instant of `schedule` strictly after `reference`.
///
/// Weekly schedules never resolve to the reference day itself, even when it
/// already is the target weekday: the earliest result is one week later.
pub fn compute_next(schedule: &Schedule, reference: NaiveDateTime) -> Result<NaiveDateTime> {
    schedule.validate()?;
    let at = schedule.time_of_day;
    let today = reference.date();

    let next = match schedule.cadence {
        Cadence::Daily => (today + Duration::days(1)).and_time(at),
        Cadence::Weekly { weekday } => {
            let current = i64::from(today.weekday().number_from_monday());
            let mut days = (i64::from(weekday) - current + 7).rem_euclid(7);
            if days == 0 {
                days = 7;
            }
            (today + Duration::days(days)).and_time(at)
        }
        Cadence::Monthly { day } => {
            let candidate = clamped_date(today.year(), today.month(), day)?.and_time(at);
            if candidate > reference {
                candidate
            } else {
                let (year, month) = following_month(today.year(), today.month());
                clamped_date(year, month, day)?.and_time(at)
            }
        }
        Cadence::Yearly { day, month } => {
            let candidate = clamped_date(today.year(), u32::from(month), day)?.and_time(at);
            if candidate > reference {
                candidate
            } else {
                clamped_date(today.year() + 1, u32::from(month), day)?.and_time(at)
            }
        }
    };

    debug_assert!(next > reference);
    Ok(next)
}

/// Walks the schedule forward from `anchor` until it passes `floor`.
///
/// Keeps the result on the schedule's own grid (no drift from the time the
/// caller happened to observe) while guaranteeing the result is after `floor`.
pub fn compute_next_after(
    schedule: &Schedule,
    anchor: NaiveDateTime,
    floor: NaiveDateTime,
) -> Result<NaiveDateTime> {
    let mut next = compute_next(schedule, anchor)?;
    let mut steps = 0usize;
    while next <= floor {
        steps += 1;
        if steps >= MAX_CATCH_UP_STEPS {
            tracing::debug!(%anchor, %floor, "schedule too far behind, re-anchoring on floor");
            return compute_next(schedule, floor);
        }
        next = compute_next(schedule, next)?;
    }
    Ok(next)
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = following_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn clamped_date(year: i32, month: u32, day: u8) -> Result<NaiveDate> {
    let day = u32::from(day).min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| LedgerError::validation(format!("invalid date {year}-{month:02}-{day:02}")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn schedule(cadence: Cadence) -> Schedule {
        Schedule::new(cadence, NaiveTime::from_hms_opt(9, 30, 0).unwrap())
    }

    #[test]
    fn daily_moves_to_next_day_at_time_of_day() {
        let next = compute_next(&schedule(Cadence::Daily), at(2025, 1, 31, 23, 0)).unwrap();
        assert_eq!(next, at(2025, 2, 1, 9, 30));
    }

    #[test]
    fn weekly_targets_upcoming_weekday() {
        // 2025-04-02 is a Wednesday; Friday is weekday 5.
        let next = compute_next(&schedule(Cadence::Weekly { weekday: 5 }), at(2025, 4, 2, 8, 0))
            .unwrap();
        assert_eq!(next, at(2025, 4, 4, 9, 30));
    }

    #[test]
    fn weekly_wraps_into_next_week() {
        // Wednesday reference, Monday target.
        let next = compute_next(&schedule(Cadence::Weekly { weekday: 1 }), at(2025, 4, 2, 8, 0))
            .unwrap();
        assert_eq!(next, at(2025, 4, 7, 9, 30));
    }

    #[test]
    fn monthly_uses_current_month_when_still_ahead() {
        let next =
            compute_next(&schedule(Cadence::Monthly { day: 15 }), at(2025, 4, 10, 12, 0)).unwrap();
        assert_eq!(next, at(2025, 4, 15, 9, 30));
    }

    #[test]
    fn monthly_same_day_after_time_moves_on() {
        let next =
            compute_next(&schedule(Cadence::Monthly { day: 15 }), at(2025, 4, 15, 9, 30)).unwrap();
        assert_eq!(next, at(2025, 5, 15, 9, 30));
    }

    #[test]
    fn monthly_clamps_into_february() {
        let next =
            compute_next(&schedule(Cadence::Monthly { day: 31 }), at(2025, 1, 31, 10, 0)).unwrap();
        assert_eq!(next, at(2025, 2, 28, 9, 30));
        let leap =
            compute_next(&schedule(Cadence::Monthly { day: 30 }), at(2024, 2, 1, 10, 0)).unwrap();
        assert_eq!(leap, at(2024, 2, 29, 9, 30));
    }

    #[test]
    fn monthly_december_rolls_into_january() {
        let next =
            compute_next(&schedule(Cadence::Monthly { day: 5 }), at(2025, 12, 20, 0, 0)).unwrap();
        assert_eq!(next, at(2026, 1, 5, 9, 30));
    }

    #[test]
    fn yearly_leap_day_in_common_year_clamps() {
        let next = compute_next(
            &schedule(Cadence::Yearly { day: 29, month: 2 }),
            at(2024, 3, 1, 0, 0),
        )
        .unwrap();
        assert_eq!(next, at(2025, 2, 28, 9, 30));
    }

    #[test]
    fn catch_up_stays_on_grid() {
        let sched = schedule(Cadence::Daily);
        let anchor = at(2025, 5, 1, 9, 30);
        let floor = at(2025, 5, 4, 10, 0);
        assert_eq!(
            compute_next_after(&sched, anchor, floor).unwrap(),
            at(2025, 5, 5, 9, 30)
        );
    }

    #[test]
    fn days_in_month_handles_december() {
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2100, 2), 28);
    }
}
