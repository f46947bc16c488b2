use crate::reminder::{Recurrence, RecurrenceKind};
use chrono::{Days, Months, NaiveDateTime};

/// Computes the occurrence that follows `due_at`.
///
/// Returns `due_at` itself when it hasn't happened yet, the timestamp one
/// interval later otherwise, or `None` once the rule's end date is passed.
/// Months and years clamp the day to the end of the target month.
pub fn next_occurrence(
    due_at: NaiveDateTime,
    rule: &Recurrence,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if now < due_at {
        return Some(due_at);
    }

    let next = advance(due_at, rule.kind, rule.interval)?;

    match rule.end_date {
        Some(end) if next.date() > end => None,
        _ => Some(next),
    }
}

/// One step of `interval` units. `None` on overflow.
pub fn advance(at: NaiveDateTime, kind: RecurrenceKind, interval: u32) -> Option<NaiveDateTime> {
    let interval = interval.max(1);
    match kind {
        RecurrenceKind::Daily => at.checked_add_days(Days::new(u64::from(interval))),
        RecurrenceKind::Weekly => at.checked_add_days(Days::new(u64::from(interval) * 7)),
        RecurrenceKind::Monthly => at.checked_add_months(Months::new(interval)),
        RecurrenceKind::Yearly => at.checked_add_months(Months::new(interval.checked_mul(12)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{parse_date, parse_time};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_date(date).unwrap().and_time(parse_time(time).unwrap())
    }

    fn rule(kind: RecurrenceKind, interval: u32) -> Recurrence {
        Recurrence::new(kind, interval)
    }

    #[test]
    fn test_not_yet_due_returns_input() {
        let due = at("2024-05-10", "08:00");
        let now = at("2024-05-09", "23:59");
        assert_eq!(
            next_occurrence(due, &rule(RecurrenceKind::Daily, 3), now),
            Some(due)
        );
    }

    #[test]
    fn test_daily_and_weekly_add_exact_days() {
        let due = at("2024-02-27", "07:15:30");
        let now = at("2024-02-27", "07:15:30");

        for interval in [1u32, 2, 5, 30] {
            let next = next_occurrence(due, &rule(RecurrenceKind::Daily, interval), now).unwrap();
            assert!(next > due);
            assert_eq!((next - due).num_days(), i64::from(interval));
            assert_eq!(next.time(), due.time());

            let next = next_occurrence(due, &rule(RecurrenceKind::Weekly, interval), now).unwrap();
            assert_eq!((next - due).num_days(), i64::from(interval) * 7);
        }
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let now = at("2024-12-31", "00:00");
        let leap = next_occurrence(at("2024-01-31", "09:00"), &rule(RecurrenceKind::Monthly, 1), now);
        assert_eq!(leap, Some(at("2024-02-29", "09:00")));

        let now = at("2023-12-31", "00:00");
        let common = next_occurrence(at("2023-01-31", "09:00"), &rule(RecurrenceKind::Monthly, 1), now);
        assert_eq!(common, Some(at("2023-02-28", "09:00")));

        let now = at("2024-12-31", "00:00");
        let quarter = next_occurrence(at("2024-08-31", "18:00"), &rule(RecurrenceKind::Monthly, 3), now);
        assert_eq!(quarter, Some(at("2024-11-30", "18:00")));
    }

    #[test]
    fn test_yearly_clamps_leap_day() {
        let now = at("2024-03-01", "00:00");
        let next = next_occurrence(at("2024-02-29", "12:00"), &rule(RecurrenceKind::Yearly, 1), now);
        assert_eq!(next, Some(at("2025-02-28", "12:00")));

        let next = next_occurrence(at("2024-02-29", "12:00"), &rule(RecurrenceKind::Yearly, 4), now);
        assert_eq!(next, Some(at("2028-02-29", "12:00")));
    }

    #[test]
    fn test_end_date_stops_recurrence() {
        let now = at("2024-02-01", "00:00");
        let due = at("2024-01-31", "09:00");

        let ended = rule(RecurrenceKind::Monthly, 1).until(parse_date("2024-02-15").unwrap());
        assert_eq!(next_occurrence(due, &ended, now), None);

        let open = rule(RecurrenceKind::Monthly, 1).until(parse_date("2024-03-01").unwrap());
        assert_eq!(next_occurrence(due, &open, now), Some(at("2024-02-29", "09:00")));
    }

    #[test]
    fn test_occurrence_on_end_date_still_fires() {
        let now = at("2024-02-10", "10:00");
        let ended = rule(RecurrenceKind::Daily, 1).until(parse_date("2024-02-11").unwrap());
        assert_eq!(
            next_occurrence(at("2024-02-10", "10:00"), &ended, now),
            Some(at("2024-02-11", "10:00"))
        );
    }

    #[test]
    fn test_overflow_ends_recurrence() {
        let due = NaiveDateTime::MAX;
        assert_eq!(next_occurrence(due, &rule(RecurrenceKind::Yearly, 1), due), None);
    }
}
