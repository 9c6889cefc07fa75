//! Notification row model.

use shiftwatch_core::notification::{Notification, ShiftChange};
use shiftwatch_core::types::{DbId, LocalTimestamp};
use shiftwatch_core::CoreError;
use sqlx::FromRow;

/// A row from the `notification` table, enums still as stored text.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub user_id: String,
    pub shift_modified_at: LocalTimestamp,
    pub window_start: LocalTimestamp,
    pub window_end: LocalTimestamp,
    pub activity_label: Option<String>,
    pub parent_kind: String,
    pub change_kind: String,
    pub processed: bool,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            change: ShiftChange {
                user_id: row.user_id,
                shift_modified_at: row.shift_modified_at,
                window_start: row.window_start,
                window_end: row.window_end,
                activity_label: row.activity_label,
                parent_kind: row.parent_kind.parse()?,
                change_kind: row.change_kind.parse()?,
            },
            processed: row.processed,
        })
    }
}
