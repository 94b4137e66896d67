use crate::api::punch::{PunchBatchResponse, PunchPayload, PunchRequest, PunchResult};
use crate::auth::device::DEVICE_KEY_HEADER;
use crate::model::punch::PunchType;
use utoipa::Modify;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Punch API",
        version = "1.0.0",
        description = r#"
## Attendance Punch Ingestion

Ingests clock events from badge reader devices and maintains the daily
attendance summaries derived from them.

### 🔹 Behavior
- **Single or bulk** — one punch object, or `{"punches": [...]}`
- **Direction auto-detect** — unlabeled punches toggle against the
  employee's most recent punch of that day (first punch of a day is `in`)
- **Daily summary** — first check-in and last check-out per day, with
  worked hours recomputed from the full day of punches on every `out`
- **Partial success** — items fail independently; a batch with failures
  returns `207 Multi-Status`

### 🔐 Security
Devices authenticate with a shared secret in the `x-api-key` header.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::punch::record_punches
    ),
    components(
        schemas(
            PunchPayload,
            PunchRequest,
            PunchResult,
            PunchBatchResponse,
            PunchType
        )
    ),
    modifiers(&DeviceKeySecurity),
    tags(
        (name = "Punch", description = "Badge reader punch ingestion APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the shared-secret header scheme referenced by the punch path.
pub struct DeviceKeySecurity;

impl Modify for DeviceKeySecurity {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "device_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(DEVICE_KEY_HEADER))),
        );
    }
}
