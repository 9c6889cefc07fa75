//! Collaborator seams used by the ingestion and delivery pipelines.
//!
//! Production implementations live in `shiftwatch-db` (PostgreSQL) and
//! `shiftwatch-events` (HTTP clients). Every method is expected to carry
//! its own timeout; none may block indefinitely.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;
use crate::kinds::{NotifiableChange, ParentKind};
use crate::notification::{Notification, RawChange, ShiftChange, UserPreference};
use crate::template::Personalisation;
use crate::types::{DbId, LocalTimestamp, Region, SourceId};

/// The external scheduling system's queue of modified details.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Current batch of unacknowledged changes for `region`.
    async fn fetch_modified(&self, region: Region) -> Result<Vec<RawChange>, CoreError>;

    /// Remove the given records from the source's queue.
    async fn acknowledge(&self, region: Region, source_ids: &[SourceId]) -> Result<(), CoreError>;
}

/// Read-only existence checks the classifier runs against stored rows.
///
/// User ids are matched case-insensitively.
#[async_trait]
pub trait NotificationLookup: Send + Sync {
    /// Rows matching the idempotency key exactly.
    async fn count_existing(
        &self,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        shift_modified_at: LocalTimestamp,
    ) -> Result<i64, CoreError>;

    /// Rows for the same shift carrying the given change kind.
    async fn count_existing_by_action(
        &self,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        change_kind: NotifiableChange,
    ) -> Result<i64, CoreError>;
}

/// Durable notification storage.
#[async_trait]
pub trait NotificationStore: NotificationLookup {
    async fn find_unprocessed(&self) -> Result<Vec<Notification>, CoreError>;

    /// Insert every change as an unprocessed row, atomically.
    async fn insert_all(&self, changes: &[ShiftChange]) -> Result<(), CoreError>;

    /// Set `processed = true` on the given rows. Idempotent.
    async fn mark_processed(&self, ids: &[DbId]) -> Result<(), CoreError>;

    /// A user's rows whose modification date falls within `[from, to]`,
    /// ordered by modification time.
    async fn find_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Notification>, CoreError>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Fetch the user's preference, creating the default one if absent.
    async fn get_or_create(&self, user_id: &str) -> Result<UserPreference, CoreError>;
}

/// The outbound email/SMS provider.
///
/// Any provider-side failure must be reported as [`CoreError::Dispatch`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send_email(
        &self,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError>;

    async fn send_sms(
        &self,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError>;
}
