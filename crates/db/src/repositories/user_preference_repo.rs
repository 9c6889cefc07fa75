//! Repository for the `user_preference` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::user_preference::{UpdatePreferenceDetails, UserPreferenceRow};

/// Column list for `user_preference` queries.
const COLUMNS: &str = "user_id, snooze_until, email, sms, comm_pref";

/// Provides CRUD operations for user delivery preferences.
pub struct UserPreferenceRepo;

impl UserPreferenceRepo {
    pub async fn find(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<UserPreferenceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_preference WHERE user_id = $1");
        sqlx::query_as::<_, UserPreferenceRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the user's preference, inserting the default row first if none
    /// exists.
    ///
    /// `ON CONFLICT DO NOTHING` makes concurrent first accesses safe.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<UserPreferenceRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_preference (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        let query = format!("SELECT {COLUMNS} FROM user_preference WHERE user_id = $1");
        sqlx::query_as::<_, UserPreferenceRow>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Set (or clear) the snooze date, creating the row if needed.
    pub async fn upsert_snooze_until(
        pool: &PgPool,
        user_id: &str,
        snooze_until: Option<NaiveDate>,
    ) -> Result<UserPreferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_preference (user_id, snooze_until) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET snooze_until = EXCLUDED.snooze_until \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPreferenceRow>(&query)
            .bind(user_id)
            .bind(snooze_until)
            .fetch_one(pool)
            .await
    }

    /// Replace contact details and channel, creating the row if needed.
    pub async fn upsert_details(
        pool: &PgPool,
        user_id: &str,
        details: &UpdatePreferenceDetails,
    ) -> Result<UserPreferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_preference (user_id, email, sms, comm_pref) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
                email = EXCLUDED.email, \
                sms = EXCLUDED.sms, \
                comm_pref = EXCLUDED.comm_pref \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPreferenceRow>(&query)
            .bind(user_id)
            .bind(&details.email)
            .bind(&details.sms)
            .bind(details.channel.as_str())
            .fetch_one(pool)
            .await
    }
}
