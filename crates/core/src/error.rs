//! Error type shared by every collaborator seam.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Fetching from or acknowledging at the external change source failed.
    #[error("Change source error: {0}")]
    Source(String),

    /// Reading or writing the notification store failed.
    #[error("Notification store error: {0}")]
    Store(String),

    /// Looking up or creating a user preference failed.
    #[error("Preference store error: {0}")]
    Preference(String),

    /// The notification provider rejected or failed a send.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// Text that should name an enum variant did not match any.
    #[error("Unrecognised {kind} value: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Whether this error came from the notification provider.
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}
