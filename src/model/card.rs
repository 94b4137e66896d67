use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::punch::PunchError;

/// Badge record from the card directory. Owned and mutated by the badge
/// management tooling; read-only here.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeCard {
    pub card_id: String,
    pub employee_id: u64,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl EmployeeCard {
    /// Validates activation and expiry against a punch's effective time.
    /// Expiry is judged at the moment the punch happened, so a backdated
    /// punch from a then-valid card is accepted.
    pub fn ensure_usable(&self, at: DateTime<Utc>) -> Result<(), PunchError> {
        if !self.is_active {
            return Err(PunchError::CardInactive);
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at < at {
                return Err(PunchError::CardExpired);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card(is_active: bool, expires_at: Option<DateTime<Utc>>) -> EmployeeCard {
        EmployeeCard {
            card_id: "CARD-1".to_string(),
            employee_id: 42,
            is_active,
            expires_at,
        }
    }

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn active_card_without_expiry_is_usable() {
        assert_eq!(card(true, None).ensure_usable(ts(3, 9)), Ok(()));
    }

    #[test]
    fn inactive_card_is_always_rejected() {
        let inactive = card(false, None);
        assert_eq!(inactive.ensure_usable(ts(3, 9)), Err(PunchError::CardInactive));
        // Deterministic: asking again gives the same answer.
        assert_eq!(inactive.ensure_usable(ts(3, 9)), Err(PunchError::CardInactive));
    }

    #[test]
    fn inactive_wins_over_expired() {
        let card = card(false, Some(ts(1, 0)));
        assert_eq!(card.ensure_usable(ts(3, 9)), Err(PunchError::CardInactive));
    }

    #[test]
    fn expiry_before_punch_time_is_rejected() {
        let card = card(true, Some(ts(2, 18)));
        assert_eq!(card.ensure_usable(ts(3, 9)), Err(PunchError::CardExpired));
    }

    #[test]
    fn expiry_after_punch_time_is_usable() {
        let card = card(true, Some(ts(4, 0)));
        assert_eq!(card.ensure_usable(ts(3, 9)), Ok(()));
    }

    #[test]
    fn expiry_exactly_at_punch_time_is_usable() {
        let card = card(true, Some(ts(3, 9)));
        assert_eq!(card.ensure_usable(ts(3, 9)), Ok(()));
    }
}
