use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{error, warn};

use crate::config::Config;

/// Header carrying the shared device secret.
pub const DEVICE_KEY_HEADER: &str = "x-api-key";

/// Whole-request credential check for the punch device. Runs once per
/// request, before the body is parsed; a failure rejects the entire batch
/// with the returned response.
pub fn verify_device_key(req: &HttpRequest, config: &Config) -> Result<(), HttpResponse> {
    let Some(expected) = config.punch_api_key.as_deref() else {
        error!("PUNCH_API_KEY not configured");
        return Err(HttpResponse::InternalServerError().json(json!({
            "error": "Server configuration error"
        })));
    };

    let presented = req
        .headers()
        .get(DEVICE_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(key) if key == expected => Ok(()),
        _ => {
            warn!("Invalid API key attempt");
            Err(HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized"
            })))
        }
    }
}
