//! Delivery pipeline: unprocessed notifications out to users.
//!
//! Each run takes the set of unprocessed rows present when it starts and
//! works through it one user at a time. A user's rows are marked processed
//! only after every message for them was handed to the provider (or no
//! message was due). Any failure leaves that user's rows for the next run
//! and moves on to the next user.

pub mod notify;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use shiftwatch_core::kinds::Channel;
use shiftwatch_core::notification::{EventKey, Notification, UserPreference};
use shiftwatch_core::ports::{Dispatcher, NotificationStore, PreferenceStore};
use shiftwatch_core::template::{Personalisation, SLOT_COUNT};
use shiftwatch_core::types::DbId;
use shiftwatch_core::{Clock, CoreError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Provider template used for each channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateIds {
    pub email: String,
    pub sms: String,
}

/// Counts from one delivery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    /// Users with at least one unprocessed notification.
    pub users: usize,
    /// Users whose messages were all accepted by the provider.
    pub dispatched: usize,
    pub snoozed: usize,
    /// Users left unprocessed because of an error.
    pub failed: usize,
    /// Users on `EMAIL`/`SMS` with no usable address.
    pub skipped_no_address: usize,
    /// Provider calls that succeeded.
    pub messages: usize,
}

/// What happened to one user's group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserOutcome {
    Snoozed,
    Sent { messages: usize },
    NoAddress,
    Silent,
}

// ---------------------------------------------------------------------------
// DeliveryPipeline
// ---------------------------------------------------------------------------

pub struct DeliveryPipeline {
    store: Arc<dyn NotificationStore>,
    preferences: Arc<dyn PreferenceStore>,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    templates: TemplateIds,
    run_lock: Mutex<()>,
}

impl DeliveryPipeline {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        preferences: Arc<dyn PreferenceStore>,
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
        templates: TemplateIds,
    ) -> Self {
        Self {
            store,
            preferences,
            dispatcher,
            clock,
            templates,
            run_lock: Mutex::new(()),
        }
    }

    /// Deliver every unprocessed notification.
    pub async fn deliver_all(&self) -> Result<DeliverySummary, CoreError> {
        self.deliver_until(&CancellationToken::new()).await
    }

    /// Like [`deliver_all`](Self::deliver_all), but stops starting new users
    /// once `cancel` fires. The user in flight always finishes.
    ///
    /// Per-user failures are logged and counted. The run as a whole fails
    /// when the unprocessed set cannot be loaded, or on an unrecognised enum
    /// value, which ends the run at that user.
    pub async fn deliver_until(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DeliverySummary, CoreError> {
        let _guard = self.run_lock.lock().await;

        let pending = self.store.find_unprocessed().await?;
        let groups = group_by_user(pending);
        let today = self.clock.today();

        let mut summary = DeliverySummary {
            users: groups.len(),
            ..Default::default()
        };

        for (user_id, group) in groups {
            if cancel.is_cancelled() {
                tracing::info!(user_id, "Delivery stopped before user");
                break;
            }

            match self.deliver_user(&user_id, group, today).await {
                Ok(UserOutcome::Snoozed) => summary.snoozed += 1,
                Ok(UserOutcome::Sent { messages }) => {
                    summary.dispatched += 1;
                    summary.messages += messages;
                }
                Ok(UserOutcome::NoAddress) => summary.skipped_no_address += 1,
                Ok(UserOutcome::Silent) => {}
                Err(e @ CoreError::UnknownVariant { .. }) => {
                    tracing::error!(user_id, error = %e, "Contract error, aborting delivery run");
                    return Err(e);
                }
                Err(e) if e.is_dispatch() => {
                    summary.failed += 1;
                    tracing::warn!(user_id, error = %e, "Dispatch failed, will retry next run");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(user_id, error = %e, "Delivery failed for user");
                }
            }
        }

        if summary.users > 0 {
            tracing::info!(
                users = summary.users,
                dispatched = summary.dispatched,
                snoozed = summary.snoozed,
                failed = summary.failed,
                skipped_no_address = summary.skipped_no_address,
                messages = summary.messages,
                "Delivery run complete"
            );
        }

        Ok(summary)
    }

    async fn deliver_user(
        &self,
        user_id: &str,
        group: Vec<Notification>,
        today: chrono::NaiveDate,
    ) -> Result<UserOutcome, CoreError> {
        let preference = self.preferences.get_or_create(user_id).await?;
        if preference.is_snoozed(today) {
            tracing::debug!(user_id, until = ?preference.snooze_until, "User snoozed");
            return Ok(UserOutcome::Snoozed);
        }

        let ids: Vec<DbId> = group.iter().map(|n| n.id).collect();
        let outcome = self.dispatch(&preference, latest_per_event(group), today).await?;

        self.store.mark_processed(&ids).await?;
        tracing::debug!(user_id, count = ids.len(), "Marked notifications processed");

        Ok(outcome)
    }

    /// Send one message per chunk of [`SLOT_COUNT`] changes.
    async fn dispatch(
        &self,
        preference: &UserPreference,
        changes: Vec<Notification>,
        today: chrono::NaiveDate,
    ) -> Result<UserOutcome, CoreError> {
        let channel = preference.channel;
        let template_id = match channel {
            Channel::Email => &self.templates.email,
            Channel::Sms => &self.templates.sms,
            Channel::None => return Ok(UserOutcome::Silent),
        };
        let Some(address) = preference.delivery_address() else {
            tracing::debug!(
                user_id = %preference.user_id,
                %channel,
                "No address for channel, skipping dispatch"
            );
            return Ok(UserOutcome::NoAddress);
        };

        let mut messages = 0;
        for chunk in changes.chunks(SLOT_COUNT) {
            let personalisation =
                Personalisation::for_chunk(chunk.iter().map(|n| &n.change), channel, today);
            if channel == Channel::Sms {
                self.dispatcher
                    .send_sms(template_id, address, &personalisation)
                    .await?;
            } else {
                self.dispatcher
                    .send_email(template_id, address, &personalisation)
                    .await?;
            }
            messages += 1;
        }

        Ok(UserOutcome::Sent { messages })
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group rows by exact user id, in user id order.
fn group_by_user(rows: Vec<Notification>) -> BTreeMap<String, Vec<Notification>> {
    let mut groups: BTreeMap<String, Vec<Notification>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.change.user_id.clone())
            .or_default()
            .push(row);
    }
    groups
}

/// Keep one row per logical event, the most recently modified, ordered by
/// window start.
///
/// Ties on modification time go to the highest id.
fn latest_per_event(rows: Vec<Notification>) -> Vec<Notification> {
    let mut latest: HashMap<EventKey, Notification> = HashMap::new();
    for row in rows {
        let key = row.change.event_key();
        match latest.get(&key) {
            Some(kept)
                if (kept.change.shift_modified_at, kept.id)
                    >= (row.change.shift_modified_at, row.id) => {}
            _ => {
                latest.insert(key, row);
            }
        }
    }

    let mut kept: Vec<Notification> = latest.into_values().collect();
    kept.sort_by_key(|n| (n.change.window_start, n.id));
    kept
}
