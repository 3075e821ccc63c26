mod common;

use chrono::{Datelike, Duration, NaiveTime, Weekday};
use common::at;
use ops_ledger::{
    errors::LedgerError,
    ledger::{compute_next, compute_next_after, Cadence, Schedule},
};

fn schedule(cadence: Cadence) -> Schedule {
    Schedule::new(cadence, NaiveTime::from_hms_opt(6, 15, 0).unwrap())
}

fn sample_cadences() -> Vec<Cadence> {
    let mut cadences = vec![Cadence::Daily];
    cadences.extend((1..=7).map(|weekday| Cadence::Weekly { weekday }));
    cadences.extend([1, 15, 28, 29, 30, 31].map(|day| Cadence::Monthly { day }));
    cadences.extend([
        Cadence::Yearly { day: 29, month: 2 },
        Cadence::Yearly { day: 31, month: 12 },
        Cadence::Yearly { day: 1, month: 1 },
    ]);
    cadences
}

#[test]
fn next_occurrence_is_always_after_reference() {
    let mut reference = at(2023, 12, 25, 0, 0);
    let end = at(2025, 3, 5, 0, 0);
    while reference < end {
        for cadence in sample_cadences() {
            let sched = schedule(cadence);
            let next = compute_next(&sched, reference).unwrap();
            assert!(next > reference, "{cadence:?} from {reference} gave {next}");
            assert_eq!(next.time(), sched.time_of_day);
        }
        reference += Duration::hours(13);
    }
}

#[test]
fn monthly_31_in_april_lands_on_30th() {
    let next = compute_next(&schedule(Cadence::Monthly { day: 31 }), at(2025, 4, 1, 0, 0)).unwrap();
    assert_eq!(next, at(2025, 4, 30, 6, 15));
}

#[test]
fn weekly_on_same_weekday_is_exactly_one_week_later() {
    let reference = at(2025, 4, 7, 5, 0);
    assert_eq!(reference.weekday(), Weekday::Mon);
    let next = compute_next(&schedule(Cadence::Weekly { weekday: 1 }), reference).unwrap();
    assert_eq!(next.date(), reference.date() + Duration::days(7));
}

#[test]
fn yearly_uses_current_year_when_still_ahead() {
    let next = compute_next(
        &schedule(Cadence::Yearly { day: 1, month: 6 }),
        at(2025, 5, 31, 23, 0),
    )
    .unwrap();
    assert_eq!(next, at(2025, 6, 1, 6, 15));
}

#[test]
fn leap_day_schedule_returns_to_29th_in_leap_years() {
    let sched = schedule(Cadence::Yearly { day: 29, month: 2 });
    let first = compute_next(&sched, at(2027, 3, 1, 0, 0)).unwrap();
    assert_eq!(first, at(2028, 2, 29, 6, 15));
}

#[test]
fn invalid_cadence_is_a_validation_error() {
    let err = compute_next(&schedule(Cadence::Weekly { weekday: 8 }), at(2025, 1, 1, 0, 0))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert!(compute_next(&schedule(Cadence::Monthly { day: 0 }), at(2025, 1, 1, 0, 0)).is_err());
}

#[test]
fn catch_up_skips_missed_weeks_without_drifting() {
    let sched = schedule(Cadence::Weekly { weekday: 3 });
    let anchor = at(2025, 1, 1, 6, 15);
    let floor = at(2025, 2, 3, 9, 0);
    let next = compute_next_after(&sched, anchor, floor).unwrap();
    assert_eq!(next, at(2025, 2, 5, 6, 15));
}
