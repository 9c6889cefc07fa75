//! Composition root for the shiftwatch worker.
//!
//! [`Services::build`] wires the PostgreSQL stores and HTTP clients into
//! the pipelines so the binary (or any other host) only deals with
//! configuration and lifecycle.

pub mod config;

use std::sync::Arc;

use anyhow::Context;
use shiftwatch_core::{Clock, SystemClock};
use shiftwatch_db::{DbPool, PgNotificationStore, PgPreferenceStore};
use shiftwatch_events::{
    CsrClient, DeliveryPipeline, IngestionPipeline, NotificationFeed, NotifyClient,
    PollingScheduler, PreferenceService,
};

use crate::config::WorkerConfig;

/// Every long-lived service the worker exposes.
pub struct Services {
    pub scheduler: Arc<PollingScheduler>,
    pub ingestion: Arc<IngestionPipeline>,
    pub delivery: Arc<DeliveryPipeline>,
    pub feed: Arc<NotificationFeed>,
    pub preferences: Arc<PreferenceService>,
}

impl Services {
    pub fn build(config: &WorkerConfig, pool: DbPool) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(PgNotificationStore::new(pool.clone()));
        let preference_store = Arc::new(PgPreferenceStore::new(pool.clone()));

        let source = Arc::new(CsrClient::new(&config.csr).context("Failed to build CSR client")?);
        let dispatcher =
            Arc::new(NotifyClient::new(&config.notify).context("Failed to build Notify client")?);

        let ingestion = Arc::new(IngestionPipeline::new(
            source,
            store.clone(),
            clock.clone(),
        ));
        let delivery = Arc::new(DeliveryPipeline::new(
            store.clone(),
            preference_store,
            dispatcher,
            clock.clone(),
            config.notify.template_ids(),
        ));
        let scheduler = Arc::new(PollingScheduler::new(
            ingestion.clone(),
            delivery.clone(),
            config.csr.regions.clone(),
            config.poll_interval,
        ));

        Ok(Self {
            scheduler,
            ingestion,
            delivery,
            feed: Arc::new(NotificationFeed::new(store, clock, config.feed_months)),
            preferences: Arc::new(PreferenceService::new(pool)),
        })
    }
}
