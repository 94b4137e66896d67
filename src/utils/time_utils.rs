use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Calendar day a punch belongs to. Day bucketing is the UTC date of the
/// effective punch timestamp; no facility-local truncation anywhere.
pub fn punch_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Half-open UTC window `[00:00, next day 00:00)` covering a calendar day.
pub fn day_range(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = day
        .checked_add_days(Days::new(1))
        .expect("calendar overflow")
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start, end)
}
