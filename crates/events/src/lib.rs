//! Shiftwatch pipelines and their outbound integrations.
//!
//! - [`IngestionPipeline`] pulls modified shift details from the scheduling
//!   system, classifies them and stores new notifications.
//! - [`DeliveryPipeline`] groups unprocessed notifications per user and sends
//!   one summary message per ten changes.
//! - [`CsrClient`] and [`NotifyClient`] are the HTTP collaborators for the
//!   change source and the message provider.
//! - [`NotificationFeed`] renders a user's notification history on demand.
//! - [`PreferenceService`] maintains per-user delivery settings.
//! - [`PollingScheduler`] drives both pipelines on a fixed period.

pub mod config;
pub mod delivery;
pub mod feed;
pub mod ingest;
pub mod preferences;
pub mod scheduler;
pub mod source;

pub use delivery::notify::{NotifyClient, NotifyConfig};
pub use delivery::{DeliveryPipeline, DeliverySummary, TemplateIds};
pub use feed::{FeedEntry, FeedQuery, NotificationFeed};
pub use ingest::{IngestSummary, IngestionPipeline};
pub use preferences::PreferenceService;
pub use scheduler::PollingScheduler;
pub use source::{CsrClient, CsrConfig};
