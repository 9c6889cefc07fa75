//! Domain records flowing through ingestion and delivery.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::kinds::{ChangeKind, Channel, NotifiableChange, ParentKind};
use crate::types::{DbId, LocalTimestamp, SourceId, UserId};

// ---------------------------------------------------------------------------
// RawChange
// ---------------------------------------------------------------------------

/// One modified-detail record as fetched from the external source.
///
/// Owned by the source; read once per ingestion cycle and acknowledged
/// afterwards by `source_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChange {
    pub source_id: SourceId,
    pub user_id: Option<UserId>,
    pub shift_modified_at: Option<LocalTimestamp>,
    pub window_start: LocalTimestamp,
    pub window_end: LocalTimestamp,
    /// `None` means the change applies to the whole shift.
    pub activity_label: Option<String>,
    pub parent_kind: ParentKind,
    pub change_kind: ChangeKind,
}

impl RawChange {
    pub fn is_shift_level(&self) -> bool {
        self.activity_label.is_none()
    }
}

// ---------------------------------------------------------------------------
// ShiftChange / Notification
// ---------------------------------------------------------------------------

/// The facts of a notifiable change, without storage identity.
///
/// This is what ingestion writes and what the renderer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftChange {
    pub user_id: UserId,
    pub shift_modified_at: LocalTimestamp,
    pub window_start: LocalTimestamp,
    pub window_end: LocalTimestamp,
    pub activity_label: Option<String>,
    pub parent_kind: ParentKind,
    pub change_kind: NotifiableChange,
}

impl ShiftChange {
    /// Key identifying the same logical shift event across re-reports.
    ///
    /// User ids are compared case-insensitively.
    pub fn event_key(&self) -> EventKey {
        EventKey {
            window_start: self.window_start,
            parent_kind: self.parent_kind,
            user_id: self.user_id.to_uppercase(),
        }
    }
}

/// See [`ShiftChange::event_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub window_start: LocalTimestamp,
    pub parent_kind: ParentKind,
    pub user_id: String,
}

/// A persisted notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: DbId,
    #[serde(flatten)]
    pub change: ShiftChange,
    pub processed: bool,
}

// ---------------------------------------------------------------------------
// UserPreference
// ---------------------------------------------------------------------------

/// A user's delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: UserId,
    pub snooze_until: Option<NaiveDate>,
    pub email: Option<String>,
    pub sms: Option<String>,
    pub channel: Channel,
}

impl UserPreference {
    /// The preference created on first access.
    pub fn new_default(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            snooze_until: None,
            email: None,
            sms: None,
            channel: Channel::None,
        }
    }

    /// Snoozed when the snooze date is today or later.
    pub fn is_snoozed(&self, today: NaiveDate) -> bool {
        self.snooze_until.is_some_and(|until| until >= today)
    }

    /// Non-blank contact address for the selected channel.
    pub fn delivery_address(&self) -> Option<&str> {
        let address = match self.channel {
            Channel::Email => self.email.as_deref(),
            Channel::Sms => self.sms.as_deref(),
            Channel::None => None,
        };
        address.map(str::trim).filter(|a| !a.is_empty())
    }
}
