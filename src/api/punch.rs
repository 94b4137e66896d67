use actix_web::{HttpRequest, HttpResponse, Responder, http::StatusCode, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::auth::device::verify_device_key;
use crate::config::Config;
use crate::model::attendance::Attendance;
use crate::model::card::EmployeeCard;
use crate::model::punch::{PunchError, PunchType};
use crate::utils::time_utils::{day_range, punch_day};
use crate::utils::work_hours::total_work_hours;

/// Source tag stamped on punches arriving through the badge reader path.
const PUNCH_SOURCE: &str = "card";

const STATUS_PRESENT: &str = "present";

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PunchRequest {
    /// Badge identifier read by the device. A punch without one is
    /// rejected as a per-item error, not a request error.
    #[schema(example = "CARD-0042")]
    pub card_id: Option<String>,

    /// Effective punch time; defaults to the time of receipt.
    #[schema(example = "2026-02-03T09:00:00Z", value_type = Option<String>, format = "date-time")]
    pub punch_time: Option<DateTime<Utc>>,

    pub device_id: Option<String>,
    pub device_location: Option<String>,

    /// Explicit direction. When absent it is detected from the employee's
    /// punch history for that day.
    pub punch_type: Option<PunchType>,
}

/// Devices post either a bare punch object or a `punches` wrapper.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PunchPayload {
    Bulk { punches: Vec<PunchRequest> },
    Single(PunchRequest),
}

impl PunchPayload {
    pub fn into_punches(self) -> Vec<PunchRequest> {
        match self {
            PunchPayload::Bulk { punches } => punches,
            PunchPayload::Single(punch) => vec![punch],
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PunchResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1234)]
    pub punch_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub punch_type: Option<PunchType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub punch_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Card is inactive")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PunchBatchResponse {
    pub success: bool,
    pub results: Vec<PunchResult>,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
}

fn summarize(results: Vec<PunchResult>) -> PunchBatchResponse {
    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;

    PunchBatchResponse {
        success: failed == 0,
        processed: results.len(),
        successful,
        failed,
        results,
    }
}

/// Punch ingestion endpoint
#[utoipa::path(
    post,
    path = "/api/punch",
    request_body = PunchPayload,
    responses(
        (status = 200, description = "Every punch in the batch was recorded", body = PunchBatchResponse),
        (status = 207, description = "At least one punch in the batch failed", body = PunchBatchResponse),
        (status = 400, description = "Malformed request body", body = Object, example = json!({
            "error": "Invalid request body: expected value at line 1 column 1"
        })),
        (status = 401, description = "Invalid or missing device key", body = Object, example = json!({
            "error": "Unauthorized"
        })),
        (status = 500, description = "Device key not provisioned on the server", body = Object, example = json!({
            "error": "Server configuration error"
        }))
    ),
    security(
        ("device_key" = [])
    ),
    tag = "Punch"
)]
pub async fn record_punches(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Bytes,
) -> actix_web::Result<impl Responder> {
    // The device credential covers the whole batch and is checked before
    // the body is even parsed.
    if let Err(resp) = verify_device_key(&req, &config) {
        return Ok(resp);
    }

    let payload: PunchPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejected unparseable punch payload");
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": format!("Invalid request body: {e}")
            })));
        }
    };

    let punches = payload.into_punches();
    info!(count = punches.len(), "Received punch request");

    // Strictly sequential: punches in one batch may touch the same
    // employee's daily summary, and the recompute reads what earlier
    // punches wrote.
    let mut results = Vec::with_capacity(punches.len());
    for punch in &punches {
        results.push(process_punch(pool.get_ref(), punch).await);
    }

    let response = summarize(results);
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok(HttpResponse::build(status).json(response))
}

/// Runs one punch through the pipeline and folds the outcome into its
/// result entry. Failures stay inside this entry so the rest of the batch
/// keeps going.
async fn process_punch(pool: &MySqlPool, punch: &PunchRequest) -> PunchResult {
    let effective = punch.punch_time.unwrap_or_else(Utc::now);

    match punch_pipeline(pool, punch, effective).await {
        Ok((punch_id, punch_type)) => PunchResult {
            card_id: punch.card_id.clone(),
            success: true,
            punch_id: Some(punch_id),
            punch_type: Some(punch_type),
            punch_time: Some(effective),
            error: None,
        },
        Err(e) => PunchResult {
            card_id: punch.card_id.clone(),
            success: false,
            punch_id: None,
            punch_type: None,
            punch_time: None,
            error: Some(e.to_string()),
        },
    }
}

/// Card resolution → direction resolution → append → daily summary.
async fn punch_pipeline(
    pool: &MySqlPool,
    punch: &PunchRequest,
    effective: DateTime<Utc>,
) -> Result<(u64, PunchType), PunchError> {
    let card_id = match punch.card_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => return Err(PunchError::MissingCardId),
    };

    let employee_id = resolve_card(pool, card_id, effective).await?;
    let punch_type = resolve_punch_type(pool, employee_id, effective, punch.punch_type).await?;
    let punch_id = record_punch(pool, employee_id, effective, punch_type, punch, card_id).await?;
    update_daily_summary(pool, employee_id, effective, punch_type).await?;

    info!(card_id, employee_id, punch_type = %punch_type, "Punch recorded");
    Ok((punch_id, punch_type))
}

/// Maps a badge to its employee and validates the card state.
async fn resolve_card(
    pool: &MySqlPool,
    card_id: &str,
    at: DateTime<Utc>,
) -> Result<u64, PunchError> {
    let card = sqlx::query_as::<_, EmployeeCard>(
        "SELECT card_id, employee_id, is_active, expires_at FROM employee_cards WHERE card_id = ?",
    )
    .bind(card_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, card_id, "Card lookup failed");
        PunchError::RecordFailure
    })?;

    let Some(card) = card else {
        warn!(card_id, "Card not found");
        return Err(PunchError::CardNotRegistered);
    };

    card.ensure_usable(at).map_err(|e| {
        warn!(card_id, reason = %e, "Card rejected");
        e
    })?;

    Ok(card.employee_id)
}

/// Two-state toggle per employee and calendar day: an explicit direction
/// is taken verbatim, otherwise the most recent punch of the day decides.
async fn resolve_punch_type(
    pool: &MySqlPool,
    employee_id: u64,
    effective: DateTime<Utc>,
    explicit: Option<PunchType>,
) -> Result<PunchType, PunchError> {
    if let Some(explicit) = explicit {
        // Not cross-checked against history; the device is trusted.
        return Ok(explicit);
    }

    let (day_start, day_end) = day_range(punch_day(effective));

    let last = sqlx::query_scalar::<_, String>(
        r#"
        SELECT punch_type FROM attendance_punches
        WHERE employee_id = ? AND punch_time >= ? AND punch_time < ?
        ORDER BY punch_time DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Last punch lookup failed");
        PunchError::RecordFailure
    })?;

    let last = match last {
        Some(raw) => Some(parse_punch_type(&raw, employee_id)?),
        None => None,
    };

    Ok(PunchType::after_last(last))
}

/// Appends the immutable punch event and returns its id.
async fn record_punch(
    pool: &MySqlPool,
    employee_id: u64,
    effective: DateTime<Utc>,
    punch_type: PunchType,
    punch: &PunchRequest,
    card_id: &str,
) -> Result<u64, PunchError> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_punches
        (employee_id, punch_time, punch_type, card_id, device_id, device_location, source)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(effective)
    .bind(punch_type.to_string())
    .bind(card_id)
    .bind(punch.device_id.as_deref())
    .bind(punch.device_location.as_deref())
    .bind(PUNCH_SOURCE)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, card_id, employee_id, "Failed to record punch");
        PunchError::RecordFailure
    })?;

    Ok(result.last_insert_id())
}

/// Upserts the one summary row per (employee, day) and, for `out`
/// punches, recomputes the day's worked hours.
async fn update_daily_summary(
    pool: &MySqlPool,
    employee_id: u64,
    effective: DateTime<Utc>,
    punch_type: PunchType,
) -> Result<(), PunchError> {
    let day = punch_day(effective);
    let check_in = (punch_type == PunchType::In).then_some(effective);
    let check_out = (punch_type == PunchType::Out).then_some(effective);

    // One atomic statement against the (employee_id, date) unique key:
    // first check-in wins, last check-out wins.
    sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, check_in, check_out, status)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            check_in = COALESCE(check_in, VALUES(check_in)),
            check_out = COALESCE(VALUES(check_out), check_out)
        "#,
    )
    .bind(employee_id)
    .bind(day)
    .bind(check_in)
    .bind(check_out)
    .bind(STATUS_PRESENT)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to upsert daily attendance");
        PunchError::RecordFailure
    })?;

    if punch_type == PunchType::Out {
        recompute_work_hours(pool, employee_id, effective).await?;
    }

    Ok(())
}

/// Worked hours are always a full recomputation from the day's punch
/// sequence, never an incremental add, so corrected or out-of-order
/// punches cannot make the total drift.
async fn recompute_work_hours(
    pool: &MySqlPool,
    employee_id: u64,
    effective: DateTime<Utc>,
) -> Result<(), PunchError> {
    let day = punch_day(effective);
    let (day_start, day_end) = day_range(day);

    let rows = sqlx::query_as::<_, (DateTime<Utc>, String)>(
        r#"
        SELECT punch_time, punch_type FROM attendance_punches
        WHERE employee_id = ? AND punch_time >= ? AND punch_time < ?
        ORDER BY punch_time ASC
        "#,
    )
    .bind(employee_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to load day punches");
        PunchError::RecordFailure
    })?;

    let mut punches = Vec::with_capacity(rows.len());
    for (at, raw) in rows {
        punches.push((at, parse_punch_type(&raw, employee_id)?));
    }

    let hours = total_work_hours(&punches);

    let summary = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, status, work_hours
        FROM attendance
        WHERE employee_id = ? AND date = ?
        "#,
    )
    .bind(employee_id)
    .bind(day)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to load daily attendance");
        PunchError::RecordFailure
    })?;

    sqlx::query("UPDATE attendance SET work_hours = ? WHERE id = ?")
        .bind(hours)
        .bind(summary.id)
        .execute(pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to store work hours");
            PunchError::RecordFailure
        })?;

    Ok(())
}

fn parse_punch_type(raw: &str, employee_id: u64) -> Result<PunchType, PunchError> {
    raw.parse::<PunchType>().map_err(|_| {
        error!(employee_id, raw = %raw, "Unrecognized punch_type in punch history");
        PunchError::RecordFailure
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, hour, minute, 0).unwrap()
    }

    fn accepted(card_id: &str, punch_id: u64, punch_type: PunchType) -> PunchResult {
        PunchResult {
            card_id: Some(card_id.to_string()),
            success: true,
            punch_id: Some(punch_id),
            punch_type: Some(punch_type),
            punch_time: Some(ts(9, 0)),
            error: None,
        }
    }

    fn rejected(card_id: Option<&str>, error: PunchError) -> PunchResult {
        PunchResult {
            card_id: card_id.map(str::to_string),
            success: false,
            punch_id: None,
            punch_type: None,
            punch_time: None,
            error: Some(error.to_string()),
        }
    }

    #[test]
    fn payload_accepts_bare_punch_object() {
        let payload: PunchPayload =
            serde_json::from_value(json!({ "card_id": "CARD-1" })).unwrap();

        let punches = payload.into_punches();
        assert_eq!(punches.len(), 1);
        assert_eq!(punches[0].card_id.as_deref(), Some("CARD-1"));
        assert!(punches[0].punch_time.is_none());
        assert!(punches[0].punch_type.is_none());
    }

    #[test]
    fn payload_accepts_bulk_wrapper() {
        let payload: PunchPayload = serde_json::from_value(json!({
            "punches": [
                { "card_id": "CARD-1", "punch_type": "in" },
                { "card_id": "CARD-2", "punch_time": "2026-02-03T09:00:00Z" }
            ]
        }))
        .unwrap();

        let punches = payload.into_punches();
        assert_eq!(punches.len(), 2);
        assert_eq!(punches[0].punch_type, Some(PunchType::In));
        assert_eq!(punches[1].punch_time, Some(ts(9, 0)));
    }

    #[test]
    fn payload_without_card_id_still_parses() {
        // card_id is validated per item, not by the deserializer.
        let payload: PunchPayload = serde_json::from_value(json!({})).unwrap();

        let punches = payload.into_punches();
        assert_eq!(punches.len(), 1);
        assert!(punches[0].card_id.is_none());
    }

    #[test]
    fn summarize_counts_add_up() {
        let response = summarize(vec![
            accepted("CARD-1", 1, PunchType::In),
            rejected(Some("CARD-2"), PunchError::CardNotRegistered),
            accepted("CARD-3", 2, PunchType::Out),
        ]);

        assert_eq!(response.processed, 3);
        assert_eq!(response.successful, 2);
        assert_eq!(response.failed, 1);
        assert_eq!(response.processed, response.successful + response.failed);
        assert!(!response.success);
    }

    #[test]
    fn summarize_all_successful_batch() {
        let response = summarize(vec![accepted("CARD-1", 1, PunchType::In)]);
        assert!(response.success);
        assert_eq!(response.successful, 1);
        assert_eq!(response.failed, 0);
    }

    #[test]
    fn summarize_all_failed_batch() {
        let response = summarize(vec![rejected(Some("CARD-1"), PunchError::CardInactive)]);
        assert!(!response.success);
        assert_eq!(response.successful, 0);
        assert_eq!(response.failed, 1);
        assert_eq!(
            response.results[0].error.as_deref(),
            Some("Card is inactive")
        );
    }

    #[test]
    fn summarize_empty_batch_is_successful() {
        let response = summarize(Vec::new());
        assert!(response.success);
        assert_eq!(response.processed, 0);
    }

    #[test]
    fn rejected_result_serializes_without_punch_fields() {
        let value = serde_json::to_value(rejected(Some("CARD-1"), PunchError::CardInactive))
            .unwrap();

        assert_eq!(
            value,
            json!({
                "card_id": "CARD-1",
                "success": false,
                "error": "Card is inactive"
            })
        );
    }

    #[test]
    fn missing_card_id_result_omits_the_card_field() {
        let value = serde_json::to_value(rejected(None, PunchError::MissingCardId)).unwrap();

        assert_eq!(
            value,
            json!({
                "success": false,
                "error": "card_id is required"
            })
        );
    }

    #[test]
    fn accepted_result_serializes_punch_fields() {
        let value = serde_json::to_value(accepted("CARD-1", 77, PunchType::In)).unwrap();

        assert_eq!(value["card_id"], "CARD-1");
        assert_eq!(value["success"], true);
        assert_eq!(value["punch_id"], 77);
        assert_eq!(value["punch_type"], "in");
        assert!(value.get("error").is_none());
    }
}
