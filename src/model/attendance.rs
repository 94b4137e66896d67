use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily attendance summary: one row per employee per calendar day,
/// derived from that day's punches. Created on the first punch of the day,
/// updated in place afterwards, never deleted. `check_in` keeps the first
/// `in` of the day, `check_out` the latest `out`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: String,
    pub work_hours: Option<f64>,
}
