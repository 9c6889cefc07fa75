//! User preference row model and DTOs.

use chrono::NaiveDate;
use serde::Deserialize;
use shiftwatch_core::kinds::Channel;
use shiftwatch_core::notification::UserPreference;
use shiftwatch_core::CoreError;
use sqlx::FromRow;

/// A row from the `user_preference` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserPreferenceRow {
    pub user_id: String,
    pub snooze_until: Option<NaiveDate>,
    pub email: Option<String>,
    pub sms: Option<String>,
    pub comm_pref: String,
}

impl TryFrom<UserPreferenceRow> for UserPreference {
    type Error = CoreError;

    fn try_from(row: UserPreferenceRow) -> Result<Self, Self::Error> {
        Ok(UserPreference {
            user_id: row.user_id,
            snooze_until: row.snooze_until,
            email: row.email,
            sms: row.sms,
            channel: row.comm_pref.parse()?,
        })
    }
}

/// DTO for replacing a user's contact details.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePreferenceDetails {
    pub email: Option<String>,
    pub sms: Option<String>,
    pub channel: Channel,
}
