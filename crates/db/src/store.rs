//! PostgreSQL implementations of the core collaborator traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use shiftwatch_core::kinds::{NotifiableChange, ParentKind};
use shiftwatch_core::notification::{Notification, ShiftChange, UserPreference};
use shiftwatch_core::ports::{NotificationLookup, NotificationStore, PreferenceStore};
use shiftwatch_core::types::{DbId, LocalTimestamp};
use shiftwatch_core::CoreError;

use crate::repositories::{NotificationRepo, UserPreferenceRepo};
use crate::DbPool;

fn store_err(e: sqlx::Error) -> CoreError {
    CoreError::Store(e.to_string())
}

fn preference_err(e: sqlx::Error) -> CoreError {
    CoreError::Preference(e.to_string())
}

// ---------------------------------------------------------------------------
// PgNotificationStore
// ---------------------------------------------------------------------------

/// [`NotificationStore`] over the `notification` table.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: DbPool,
}

impl PgNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLookup for PgNotificationStore {
    async fn count_existing(
        &self,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        shift_modified_at: LocalTimestamp,
    ) -> Result<i64, CoreError> {
        NotificationRepo::count_existing(
            &self.pool,
            user_id,
            window_start,
            parent_kind,
            shift_modified_at,
        )
        .await
        .map_err(store_err)
    }

    async fn count_existing_by_action(
        &self,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        change_kind: NotifiableChange,
    ) -> Result<i64, CoreError> {
        NotificationRepo::count_existing_by_action(
            &self.pool,
            user_id,
            window_start,
            parent_kind,
            change_kind,
        )
        .await
        .map_err(store_err)
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn find_unprocessed(&self) -> Result<Vec<Notification>, CoreError> {
        NotificationRepo::list_unprocessed(&self.pool)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    async fn insert_all(&self, changes: &[ShiftChange]) -> Result<(), CoreError> {
        let written = NotificationRepo::insert_all(&self.pool, changes)
            .await
            .map_err(store_err)?;
        tracing::debug!(written, "Inserted notifications");
        Ok(())
    }

    async fn mark_processed(&self, ids: &[DbId]) -> Result<(), CoreError> {
        NotificationRepo::mark_processed(&self.pool, ids)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Notification>, CoreError> {
        NotificationRepo::list_for_user_between(&self.pool, user_id, from, to)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PgPreferenceStore
// ---------------------------------------------------------------------------

/// [`PreferenceStore`] over the `user_preference` table.
#[derive(Debug, Clone)]
pub struct PgPreferenceStore {
    pool: DbPool,
}

impl PgPreferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserPreference, CoreError> {
        UserPreferenceRepo::get_or_create(&self.pool, user_id)
            .await
            .map_err(preference_err)?
            .try_into()
    }
}
