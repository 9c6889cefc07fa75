//! Shiftwatch domain core.
//!
//! Zero internal dependencies: the vocabulary of shift changes, the
//! description renderer, the change classifier and the collaborator traits
//! that the database and HTTP adapters implement.
//!
//! - [`classifier`]: settling window, duplicate collapse, reclassification.
//! - [`description`]: one-line sentences per channel.
//! - [`template`]: fixed-slot message personalisation.
//! - [`ports`]: change source, notification store, preferences, dispatch.

pub mod classifier;
pub mod clock;
pub mod description;
pub mod error;
pub mod kinds;
pub mod notification;
pub mod ports;
pub mod template;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
