//! Maintenance of per-user delivery preferences.

use chrono::NaiveDate;
use shiftwatch_core::kinds::Channel;
use shiftwatch_core::notification::UserPreference;
use shiftwatch_core::CoreError;
use shiftwatch_db::models::user_preference::UpdatePreferenceDetails;
use shiftwatch_db::repositories::UserPreferenceRepo;
use shiftwatch_db::DbPool;

fn preference_err(e: sqlx::Error) -> CoreError {
    CoreError::Preference(e.to_string())
}

/// Reads and updates rows in `user_preference`.
#[derive(Debug, Clone)]
pub struct PreferenceService {
    pool: DbPool,
}

impl PreferenceService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_or_create(&self, user_id: &str) -> Result<UserPreference, CoreError> {
        UserPreferenceRepo::get_or_create(&self.pool, user_id)
            .await
            .map_err(preference_err)?
            .try_into()
    }

    /// Suppress delivery through `snooze_until` inclusive, or lift the
    /// snooze with `None`.
    pub async fn update_snooze_until(
        &self,
        user_id: &str,
        snooze_until: Option<NaiveDate>,
    ) -> Result<UserPreference, CoreError> {
        let row = UserPreferenceRepo::upsert_snooze_until(&self.pool, user_id, snooze_until)
            .await
            .map_err(preference_err)?;
        tracing::info!(user_id, ?snooze_until, "Snooze updated");
        row.try_into()
    }

    /// Replace contact details and channel.
    pub async fn update_details(
        &self,
        user_id: &str,
        details: &UpdatePreferenceDetails,
    ) -> Result<UserPreference, CoreError> {
        validate_details(details)?;
        let row = UserPreferenceRepo::upsert_details(&self.pool, user_id, details)
            .await
            .map_err(preference_err)?;
        tracing::info!(user_id, channel = %details.channel, "Contact details updated");
        row.try_into()
    }
}

/// The address for the selected channel must be present and non-blank.
pub fn validate_details(details: &UpdatePreferenceDetails) -> Result<(), CoreError> {
    let (address, field) = match details.channel {
        Channel::Email => (details.email.as_deref(), "email"),
        Channel::Sms => (details.sms.as_deref(), "sms"),
        Channel::None => return Ok(()),
    };
    match address.map(str::trim) {
        Some(a) if !a.is_empty() => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "{field} is required for channel {}",
            details.channel
        ))),
    }
}
