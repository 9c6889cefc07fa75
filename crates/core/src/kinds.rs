//! Closed vocabularies shared by the source, the store and the renderer.
//!
//! Each enum parses case-insensitively from the text used on the wire and in
//! the database, and renders back to the upper-case canonical form. Unknown
//! text is rejected with [`CoreError::UnknownVariant`] at the parsing
//! boundary so business logic only ever sees valid variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ParentKind
// ---------------------------------------------------------------------------

/// Whether a change belongs to a regular shift or an overtime shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParentKind {
    Shift,
    Overtime,
}

impl ParentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shift => "SHIFT",
            Self::Overtime => "OVERTIME",
        }
    }
}

impl FromStr for ParentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SHIFT" => Ok(Self::Shift),
            "OVERTIME" => Ok(Self::Overtime),
            _ => Err(CoreError::unknown("parent kind", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeKind
// ---------------------------------------------------------------------------

/// What the source says happened to a detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Add,
    Edit,
    Delete,
    Unchanged,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
            Self::Unchanged => "UNCHANGED",
        }
    }

    /// The persisted form of this change, or `None` for `Unchanged`.
    pub fn notifiable(self) -> Option<NotifiableChange> {
        match self {
            Self::Add => Some(NotifiableChange::Add),
            Self::Edit => Some(NotifiableChange::Edit),
            Self::Delete => Some(NotifiableChange::Delete),
            Self::Unchanged => None,
        }
    }
}

impl FromStr for ChangeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADD" => Ok(Self::Add),
            "EDIT" => Ok(Self::Edit),
            "DELETE" => Ok(Self::Delete),
            "UNCHANGED" => Ok(Self::Unchanged),
            _ => Err(CoreError::unknown("change kind", s)),
        }
    }
}

/// The subset of [`ChangeKind`] that can be stored on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifiableChange {
    Add,
    Edit,
    Delete,
}

impl NotifiableChange {
    pub fn as_str(self) -> &'static str {
        ChangeKind::from(self).as_str()
    }

    /// Verb phrase used after "has" in a rendered description.
    pub fn action_phrase(self) -> &'static str {
        match self {
            Self::Add => "been added",
            Self::Edit => "changed",
            Self::Delete => "been removed",
        }
    }
}

impl From<NotifiableChange> for ChangeKind {
    fn from(change: NotifiableChange) -> Self {
        match change {
            NotifiableChange::Add => Self::Add,
            NotifiableChange::Edit => Self::Edit,
            NotifiableChange::Delete => Self::Delete,
        }
    }
}

impl FromStr for NotifiableChange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<ChangeKind>()?
            .notifiable()
            .ok_or_else(|| CoreError::unknown("notifiable change", s))
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A user's chosen communication channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
    #[default]
    None,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::None => "NONE",
        }
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "NONE" => Ok(Self::None),
            _ => Err(CoreError::unknown("channel", s)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(ParentKind, ChangeKind, NotifiableChange, Channel);
