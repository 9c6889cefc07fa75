//! In-memory collaborators shared by the pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use shiftwatch_core::kinds::{ChangeKind, Channel, NotifiableChange, ParentKind};
use shiftwatch_core::notification::{Notification, RawChange, ShiftChange, UserPreference};
use shiftwatch_core::ports::{
    ChangeSource, Dispatcher, NotificationLookup, NotificationStore, PreferenceStore,
};
use shiftwatch_core::template::Personalisation;
use shiftwatch_core::types::{DbId, LocalTimestamp, Region, SourceId};
use shiftwatch_core::{CoreError, FixedClock};
use shiftwatch_events::{DeliveryPipeline, IngestionPipeline, TemplateIds};

pub const EMAIL_TEMPLATE: &str = "email-template";
pub const SMS_TEMPLATE: &str = "sms-template";

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn clock(now: NaiveDateTime) -> Arc<FixedClock> {
    Arc::new(FixedClock(now))
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

/// A detail-level change on 2022-03-31 10:00-11:00.
pub fn raw(id: SourceId, user: &str, modified: NaiveDateTime, kind: ChangeKind) -> RawChange {
    RawChange {
        source_id: id,
        user_id: Some(user.to_string()),
        shift_modified_at: Some(modified),
        window_start: at(2022, 3, 31, 10, 0),
        window_end: at(2022, 3, 31, 11, 0),
        activity_label: Some("CCTV monitoring".to_string()),
        parent_kind: ParentKind::Shift,
        change_kind: kind,
    }
}

/// A whole-shift change for the given day.
pub fn raw_shift(
    id: SourceId,
    user: &str,
    modified: NaiveDateTime,
    day: u32,
    kind: ChangeKind,
) -> RawChange {
    RawChange {
        source_id: id,
        user_id: Some(user.to_string()),
        shift_modified_at: Some(modified),
        window_start: at(2022, 3, day, 0, 0),
        window_end: at(2022, 3, day, 0, 0),
        activity_label: None,
        parent_kind: ParentKind::Shift,
        change_kind: kind,
    }
}

/// An unprocessed shift-level `ADD` starting on `start`.
pub fn change(user: &str, start: NaiveDateTime, modified: NaiveDateTime) -> ShiftChange {
    ShiftChange {
        user_id: user.to_string(),
        shift_modified_at: modified,
        window_start: start,
        window_end: start,
        activity_label: None,
        parent_kind: ParentKind::Shift,
        change_kind: NotifiableChange::Add,
    }
}

// ---------------------------------------------------------------------------
// FakeSource
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSource {
    queues: Mutex<HashMap<Region, Vec<RawChange>>>,
    acknowledged: Mutex<Vec<(Region, Vec<SourceId>)>>,
    failing: Mutex<HashSet<Region>>,
}

impl FakeSource {
    pub fn with(region: Region, batch: Vec<RawChange>) -> Arc<Self> {
        let source = Self::default();
        source.push(region, batch);
        Arc::new(source)
    }

    pub fn push(&self, region: Region, batch: Vec<RawChange>) {
        self.queues
            .lock()
            .unwrap()
            .entry(region)
            .or_default()
            .extend(batch);
    }

    pub fn fail_region(&self, region: Region) {
        self.failing.lock().unwrap().insert(region);
    }

    pub fn remaining(&self, region: Region) -> Vec<SourceId> {
        self.queues
            .lock()
            .unwrap()
            .get(&region)
            .map(|q| q.iter().map(|c| c.source_id).collect())
            .unwrap_or_default()
    }

    pub fn acknowledged(&self) -> Vec<(Region, Vec<SourceId>)> {
        self.acknowledged.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeSource for FakeSource {
    async fn fetch_modified(&self, region: Region) -> Result<Vec<RawChange>, CoreError> {
        if self.failing.lock().unwrap().contains(&region) {
            return Err(CoreError::Source(format!("region {region} unavailable")));
        }
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get(&region)
            .cloned()
            .unwrap_or_default())
    }

    async fn acknowledge(&self, region: Region, source_ids: &[SourceId]) -> Result<(), CoreError> {
        if let Some(queue) = self.queues.lock().unwrap().get_mut(&region) {
            queue.retain(|c| !source_ids.contains(&c.source_id));
        }
        self.acknowledged
            .lock()
            .unwrap()
            .push((region, source_ids.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Notification>>,
    insert_calls: Mutex<usize>,
    mark_calls: Mutex<Vec<Vec<DbId>>>,
    failing_inserts: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed rows directly, bypassing the insert counter.
    pub fn seed(&self, changes: Vec<ShiftChange>) -> Vec<DbId> {
        let mut rows = self.rows.lock().unwrap();
        changes
            .into_iter()
            .map(|change| {
                let id = rows.len() as DbId + 1;
                rows.push(Notification {
                    id,
                    change,
                    processed: false,
                });
                id
            })
            .collect()
    }

    pub fn rows(&self) -> Vec<Notification> {
        self.rows.lock().unwrap().clone()
    }

    pub fn unprocessed_ids(&self) -> Vec<DbId> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| !n.processed)
            .map(|n| n.id)
            .collect()
    }

    /// Every later `insert_all` fails with a store error.
    pub fn fail_inserts(&self) {
        *self.failing_inserts.lock().unwrap() = true;
    }

    pub fn insert_calls(&self) -> usize {
        *self.insert_calls.lock().unwrap()
    }

    pub fn mark_calls(&self) -> Vec<Vec<DbId>> {
        self.mark_calls.lock().unwrap().clone()
    }
}

fn same_user(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl NotificationLookup for MemoryStore {
    async fn count_existing(
        &self,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        shift_modified_at: LocalTimestamp,
    ) -> Result<i64, CoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|n| {
                same_user(&n.change.user_id, user_id)
                    && n.change.window_start == window_start
                    && n.change.parent_kind == parent_kind
                    && n.change.shift_modified_at == shift_modified_at
            })
            .count() as i64)
    }

    async fn count_existing_by_action(
        &self,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        change_kind: NotifiableChange,
    ) -> Result<i64, CoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|n| {
                same_user(&n.change.user_id, user_id)
                    && n.change.window_start == window_start
                    && n.change.parent_kind == parent_kind
                    && n.change.change_kind == change_kind
            })
            .count() as i64)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn find_unprocessed(&self) -> Result<Vec<Notification>, CoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| !n.processed)
            .cloned()
            .collect())
    }

    async fn insert_all(&self, changes: &[ShiftChange]) -> Result<(), CoreError> {
        *self.insert_calls.lock().unwrap() += 1;
        if *self.failing_inserts.lock().unwrap() {
            return Err(CoreError::Store("connection reset".into()));
        }
        self.seed(changes.to_vec());
        Ok(())
    }

    async fn mark_processed(&self, ids: &[DbId]) -> Result<(), CoreError> {
        self.mark_calls.lock().unwrap().push(ids.to_vec());
        for row in self.rows.lock().unwrap().iter_mut() {
            if ids.contains(&row.id) {
                row.processed = true;
            }
        }
        Ok(())
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Notification>, CoreError> {
        let mut found: Vec<Notification> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| {
                let day = n.change.shift_modified_at.date();
                same_user(&n.change.user_id, user_id) && day >= from && day <= to
            })
            .cloned()
            .collect();
        found.sort_by_key(|n| (n.change.shift_modified_at, n.id));
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// MemoryPreferences
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPreferences {
    prefs: Mutex<HashMap<String, UserPreference>>,
    unreadable: Mutex<HashSet<String>>,
}

impl MemoryPreferences {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, pref: UserPreference) {
        self.prefs
            .lock()
            .unwrap()
            .insert(pref.user_id.clone(), pref);
    }

    pub fn email(&self, user_id: &str, address: &str) {
        self.set(UserPreference {
            email: Some(address.to_string()),
            channel: Channel::Email,
            ..UserPreference::new_default(user_id)
        });
    }

    pub fn sms(&self, user_id: &str, number: &str) {
        self.set(UserPreference {
            sms: Some(number.to_string()),
            channel: Channel::Sms,
            ..UserPreference::new_default(user_id)
        });
    }

    /// The stored channel text for `user_id` matches no known channel.
    pub fn corrupt_channel(&self, user_id: &str) {
        self.unreadable.lock().unwrap().insert(user_id.to_string());
    }

    pub fn get(&self, user_id: &str) -> Option<UserPreference> {
        self.prefs.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get_or_create(&self, user_id: &str) -> Result<UserPreference, CoreError> {
        if self.unreadable.lock().unwrap().contains(user_id) {
            return Err(CoreError::UnknownVariant {
                kind: "channel",
                value: "FAX".to_string(),
            });
        }
        Ok(self
            .prefs
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert_with(|| UserPreference::new_default(user_id))
            .clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingDispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub channel: Channel,
    pub template_id: String,
    pub address: String,
    pub personalisation: Personalisation,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every send to `address` fails with a provider error.
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn record(
        &self,
        channel: Channel,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError> {
        if self.failing.lock().unwrap().contains(address) {
            return Err(CoreError::Dispatch(format!("provider rejected {address}")));
        }
        self.sent.lock().unwrap().push(Sent {
            channel,
            template_id: template_id.to_string(),
            address: address.to_string(),
            personalisation: personalisation.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn send_email(
        &self,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError> {
        self.record(Channel::Email, template_id, address, personalisation)
    }

    async fn send_sms(
        &self,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError> {
        self.record(Channel::Sms, template_id, address, personalisation)
    }
}

// ---------------------------------------------------------------------------
// Pipeline builders
// ---------------------------------------------------------------------------

pub fn ingestion(
    source: &Arc<FakeSource>,
    store: &Arc<MemoryStore>,
    now: NaiveDateTime,
) -> IngestionPipeline {
    IngestionPipeline::new(source.clone(), store.clone(), clock(now))
}

pub fn delivery(
    store: &Arc<MemoryStore>,
    prefs: &Arc<MemoryPreferences>,
    dispatcher: &Arc<RecordingDispatcher>,
    now: NaiveDateTime,
) -> DeliveryPipeline {
    DeliveryPipeline::new(
        store.clone(),
        prefs.clone(),
        dispatcher.clone(),
        clock(now),
        TemplateIds {
            email: EMAIL_TEMPLATE.to_string(),
            sms: SMS_TEMPLATE.to_string(),
        },
    )
}
