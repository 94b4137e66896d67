use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::model::punch::PunchType;

/// Total worked hours for one employee-day, recomputed from the day's
/// full punch sequence. The input must be in chronological order. Each
/// `in` is paired with the next unconsumed `out`; an `out` with no open
/// `in` is skipped and a trailing unmatched `in` contributes zero.
pub fn total_work_hours(punches: &[(DateTime<Utc>, PunchType)]) -> f64 {
    let mut open_ins: VecDeque<DateTime<Utc>> = VecDeque::new();
    let mut total_minutes = 0.0;

    for (at, punch_type) in punches {
        match punch_type {
            PunchType::In => open_ins.push_back(*at),
            PunchType::Out => {
                if let Some(in_at) = open_ins.pop_front() {
                    total_minutes += (*at - in_at).num_seconds() as f64 / 60.0;
                }
            }
        }
    }

    round_hours(total_minutes / 60.0)
}

fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn two_full_pairs_sum_to_eight_hours() {
        let day = [
            (at(9, 0), PunchType::In),
            (at(12, 0), PunchType::Out),
            (at(13, 0), PunchType::In),
            (at(17, 0), PunchType::Out),
        ];
        assert_eq!(total_work_hours(&day), 8.00);
    }

    #[test]
    fn trailing_in_contributes_zero() {
        let day = [
            (at(9, 0), PunchType::In),
            (at(12, 0), PunchType::Out),
            (at(13, 0), PunchType::In),
        ];
        assert_eq!(total_work_hours(&day), 3.00);
    }

    #[test]
    fn leading_out_is_skipped() {
        let day = [
            (at(8, 0), PunchType::Out),
            (at(9, 0), PunchType::In),
            (at(12, 0), PunchType::Out),
        ];
        assert_eq!(total_work_hours(&day), 3.00);
    }

    #[test]
    fn no_punches_is_zero_hours() {
        assert_eq!(total_work_hours(&[]), 0.00);
    }

    #[test]
    fn lone_in_is_zero_hours() {
        assert_eq!(total_work_hours(&[(at(9, 0), PunchType::In)]), 0.00);
    }

    #[test]
    fn doubled_in_pairs_the_earliest_first() {
        // An explicit second `in` leaves the later one unmatched.
        let day = [
            (at(8, 0), PunchType::In),
            (at(9, 0), PunchType::In),
            (at(12, 0), PunchType::Out),
        ];
        assert_eq!(total_work_hours(&day), 4.00);
    }

    #[test]
    fn fractional_hours_round_to_two_decimals() {
        // 50 minutes = 0.8333... hours
        let day = [(at(9, 0), PunchType::In), (at(9, 50), PunchType::Out)];
        assert_eq!(total_work_hours(&day), 0.83);
    }
}
