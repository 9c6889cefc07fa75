//! Ingestion pipeline: source batch in, new notifications out.
//!
//! One [`IngestionPipeline::ingest`] call is one cycle for one region:
//! fetch, classify, persist, then acknowledge. Acknowledgement is always the
//! last step so a failure anywhere earlier leaves the whole batch at the
//! source for the next cycle.

use std::sync::Arc;

use serde::Serialize;
use shiftwatch_core::classifier;
use shiftwatch_core::ports::{ChangeSource, NotificationStore};
use shiftwatch_core::types::Region;
use shiftwatch_core::{Clock, CoreError};
use tokio_util::sync::CancellationToken;

/// Counts from one region's cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub region: Region,
    /// Records returned by the source.
    pub fetched: usize,
    /// Notifications written to the store.
    pub inserted: usize,
    /// Records removed from the source queue.
    pub acknowledged: usize,
    /// Records left at the source because their user is still editing.
    pub deferred: usize,
}

// ---------------------------------------------------------------------------
// IngestionPipeline
// ---------------------------------------------------------------------------

pub struct IngestionPipeline {
    source: Arc<dyn ChangeSource>,
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn ChangeSource>,
        store: Arc<dyn NotificationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    /// Run one ingestion cycle for `region`.
    ///
    /// Any error aborts the cycle before acknowledgement.
    pub async fn ingest(&self, region: Region) -> Result<IngestSummary, CoreError> {
        let batch = self.source.fetch_modified(region).await?;
        let fetched = batch.len();
        tracing::debug!(region, fetched, "Fetched modified details");

        let outcome = classifier::classify(batch, self.clock.now(), self.store.as_ref()).await?;

        if !outcome.notifications.is_empty() {
            self.store.insert_all(&outcome.notifications).await?;
        }

        if !outcome.consumed.is_empty() {
            self.source.acknowledge(region, &outcome.consumed).await?;
        }

        let summary = IngestSummary {
            region,
            fetched,
            inserted: outcome.notifications.len(),
            acknowledged: outcome.consumed.len(),
            deferred: outcome.deferred.len(),
        };

        if summary.fetched > 0 {
            tracing::info!(
                region,
                fetched = summary.fetched,
                inserted = summary.inserted,
                acknowledged = summary.acknowledged,
                deferred = summary.deferred,
                "Ingestion cycle complete"
            );
        }

        Ok(summary)
    }

    /// Run [`ingest`](Self::ingest) for each region in turn.
    ///
    /// A failing region is logged and skipped. Cancellation is checked
    /// before each region starts; the region in flight always finishes.
    pub async fn ingest_regions(
        &self,
        regions: &[Region],
        cancel: &CancellationToken,
    ) -> Vec<IngestSummary> {
        let mut summaries = Vec::with_capacity(regions.len());

        for &region in regions {
            if cancel.is_cancelled() {
                tracing::info!(region, "Ingestion stopped before region");
                break;
            }
            match self.ingest(region).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::error!(region, error = %e, "Ingestion cycle failed");
                }
            }
        }

        summaries
    }
}
