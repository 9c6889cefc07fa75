//! Periodic driver for ingestion and delivery.
//!
//! [`PollingScheduler`] runs as a background task. Each tick ingests every
//! configured region in turn and then runs one delivery pass.

use std::sync::Arc;
use std::time::Duration;

use shiftwatch_core::types::Region;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::delivery::DeliveryPipeline;
use crate::ingest::IngestionPipeline;

/// Default period between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

// ---------------------------------------------------------------------------
// PollingScheduler
// ---------------------------------------------------------------------------

pub struct PollingScheduler {
    ingestion: Arc<IngestionPipeline>,
    delivery: Arc<DeliveryPipeline>,
    regions: Vec<Region>,
    period: Duration,
    tick_lock: Mutex<()>,
}

impl PollingScheduler {
    pub fn new(
        ingestion: Arc<IngestionPipeline>,
        delivery: Arc<DeliveryPipeline>,
        regions: Vec<Region>,
        period: Duration,
    ) -> Self {
        Self {
            ingestion,
            delivery,
            regions,
            period,
            tick_lock: Mutex::new(()),
        }
    }

    /// Run the polling loop until `cancel` fires.
    ///
    /// The first tick happens immediately. A tick in progress when `cancel`
    /// fires finishes its current region or user before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.period.as_secs(),
            regions = ?self.regions,
            "Polling scheduler started"
        );

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Polling scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.poll(&cancel).await;
                }
            }
        }
    }

    /// One tick: ingest every region, then deliver.
    ///
    /// Returns `false` without doing anything if another tick is still
    /// running.
    pub async fn poll(&self, cancel: &CancellationToken) -> bool {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            tracing::warn!("Previous poll still running, skipping tick");
            return false;
        };

        self.ingestion.ingest_regions(&self.regions, cancel).await;

        if cancel.is_cancelled() {
            return true;
        }

        if let Err(e) = self.delivery.deliver_until(cancel).await {
            tracing::error!(error = %e, "Delivery run failed");
        }
        true
    }
}
