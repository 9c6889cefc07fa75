//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod notification_repo;
pub mod user_preference_repo;

pub use notification_repo::NotificationRepo;
pub use user_preference_repo::UserPreferenceRepo;
