use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as EnumDisplay, EnumString};
use utoipa::ToSchema;

/// Direction of a clock event. Stored in MySQL and carried in JSON as the
/// lowercase string form (`in` / `out`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PunchType {
    In,
    Out,
}

impl PunchType {
    /// Toggle automaton for unlabeled punches: the first punch of a day is
    /// an `in`, an `in` is followed by an `out`, an `out` by an `in`.
    pub fn after_last(last: Option<PunchType>) -> PunchType {
        match last {
            Some(PunchType::In) => PunchType::Out,
            _ => PunchType::In,
        }
    }
}

/// Per-punch failure reported back to the device. The display form is the
/// message carried in the item's `error` field; a failed punch never
/// aborts the rest of its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PunchError {
    #[display(fmt = "card_id is required")]
    MissingCardId,
    #[display(fmt = "Card not registered")]
    CardNotRegistered,
    #[display(fmt = "Card is inactive")]
    CardInactive,
    #[display(fmt = "Card has expired")]
    CardExpired,
    #[display(fmt = "Failed to record punch")]
    RecordFailure,
}
