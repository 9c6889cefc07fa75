//! Decides which raw source changes become notifications.
//!
//! One ingestion cycle's batch goes through, in order:
//!
//! 1. **Settling window.** Users with a modification inside the last
//!    [`SETTLING_MINUTES`] are still being edited; all their records are
//!    deferred to a later cycle and are not acknowledged.
//! 2. **Duplicate collapse.** Records identical apart from source id and
//!    modification time collapse to the most recently modified one.
//! 3. **Reclassification.** A whole-shift `EDIT` for a shift that has never
//!    been notified as `ADD` is really the shift's creation, so it becomes
//!    an `ADD`.
//! 4. **Drops.** `UNCHANGED` records, remaining whole-shift `EDIT`s (the
//!    detail-level records carry the useful information) and records whose
//!    idempotency key is already stored, or already taken by an earlier
//!    record of the same batch, are discarded.
//!
//! Every record that was not deferred is reported as consumed, whether or
//! not it produced a notification.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};

use crate::error::CoreError;
use crate::kinds::{ChangeKind, NotifiableChange, ParentKind};
use crate::notification::{RawChange, ShiftChange};
use crate::ports::NotificationLookup;
use crate::types::{LocalTimestamp, SourceId};

/// Minutes a user's latest change must age before any of their changes
/// are notified.
pub const SETTLING_MINUTES: i64 = 5;

/// Outcome of classifying one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// New rows to persist, unprocessed.
    pub notifications: Vec<ShiftChange>,
    /// Source records to acknowledge.
    pub consumed: Vec<SourceId>,
    /// Source records left at the source for the next cycle.
    pub deferred: Vec<SourceId>,
}

/// Run the full classification over `batch`.
pub async fn classify<L>(
    batch: Vec<RawChange>,
    now: NaiveDateTime,
    lookup: &L,
) -> Result<Classification, CoreError>
where
    L: NotificationLookup + ?Sized,
{
    let (settled, deferred) = settle(batch, now);
    let consumed = settled.iter().map(|c| c.source_id).collect();

    let mut notifications = Vec::new();
    let mut taken = HashSet::new();
    for change in collapse_duplicates(settled) {
        let Some(notification) = decide(change, lookup).await? else {
            continue;
        };
        if !taken.insert(IdempotencyKey::from(&notification)) {
            tracing::debug!(
                user_id = %notification.user_id,
                shift_modified_at = %notification.shift_modified_at,
                "Change shares its key with an earlier record in the batch, skipping"
            );
            continue;
        }
        notifications.push(notification);
    }

    Ok(Classification {
        notifications,
        consumed,
        deferred,
    })
}

// ---------------------------------------------------------------------------
// Step 1: settling window
// ---------------------------------------------------------------------------

/// Split `batch` into records that may be processed now and the source ids
/// of records deferred because their user is still editing.
///
/// Records without a user id are never deferred. Records without a
/// modification time never defer their user on their own.
pub fn settle(batch: Vec<RawChange>, now: NaiveDateTime) -> (Vec<RawChange>, Vec<SourceId>) {
    let cutoff = now - Duration::minutes(SETTLING_MINUTES);

    let mut latest: HashMap<&str, Option<LocalTimestamp>> = HashMap::new();
    for change in &batch {
        if let Some(user) = change.user_id.as_deref() {
            let entry = latest.entry(user).or_insert(None);
            *entry = (*entry).max(change.shift_modified_at);
        }
    }

    let active: Vec<String> = latest
        .into_iter()
        .filter(|(_, max)| max.is_some_and(|m| m >= cutoff))
        .map(|(user, _)| user.to_string())
        .collect();

    if !active.is_empty() {
        tracing::debug!(users = ?active, %cutoff, "Deferring users inside the settling window");
    }

    let (deferred, settled): (Vec<RawChange>, Vec<RawChange>) =
        batch.into_iter().partition(|change| {
            change
                .user_id
                .as_ref()
                .is_some_and(|user| active.contains(user))
        });

    (settled, deferred.into_iter().map(|c| c.source_id).collect())
}

// ---------------------------------------------------------------------------
// Step 2: duplicate collapse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ContentKey {
    user_id: Option<String>,
    window_start: LocalTimestamp,
    window_end: LocalTimestamp,
    activity_label: Option<String>,
    parent_kind: ParentKind,
    change_kind: ChangeKind,
}

impl From<&RawChange> for ContentKey {
    fn from(change: &RawChange) -> Self {
        Self {
            user_id: change.user_id.clone(),
            window_start: change.window_start,
            window_end: change.window_end,
            activity_label: change.activity_label.clone(),
            parent_kind: change.parent_kind,
            change_kind: change.change_kind,
        }
    }
}

/// Collapse records that differ only in source id and modification time,
/// keeping the most recently modified. First-seen order is preserved.
pub fn collapse_duplicates(changes: Vec<RawChange>) -> Vec<RawChange> {
    let mut index: BTreeMap<ContentKey, usize> = BTreeMap::new();
    let mut kept: Vec<RawChange> = Vec::with_capacity(changes.len());

    for change in changes {
        match index.get(&ContentKey::from(&change)) {
            Some(&i) => {
                if change.shift_modified_at > kept[i].shift_modified_at {
                    kept[i] = change;
                }
            }
            None => {
                index.insert(ContentKey::from(&change), kept.len());
                kept.push(change);
            }
        }
    }

    kept
}

// ---------------------------------------------------------------------------
// Steps 3 and 4: reclassify, then drop
// ---------------------------------------------------------------------------

/// At most one row exists per key. User ids compare case-insensitively, as
/// they do in the store lookups.
#[derive(Debug, PartialEq, Eq, Hash)]
struct IdempotencyKey {
    user_id: String,
    window_start: LocalTimestamp,
    parent_kind: ParentKind,
    shift_modified_at: LocalTimestamp,
}

impl From<&ShiftChange> for IdempotencyKey {
    fn from(change: &ShiftChange) -> Self {
        Self {
            user_id: change.user_id.to_ascii_uppercase(),
            window_start: change.window_start,
            parent_kind: change.parent_kind,
            shift_modified_at: change.shift_modified_at,
        }
    }
}

async fn decide<L>(change: RawChange, lookup: &L) -> Result<Option<ShiftChange>, CoreError>
where
    L: NotificationLookup + ?Sized,
{
    let Some(mut kind) = change.change_kind.notifiable() else {
        return Ok(None);
    };

    // A row needs both an owner and a modification time to be stored.
    let (Some(user_id), Some(shift_modified_at)) = (change.user_id, change.shift_modified_at)
    else {
        tracing::debug!(
            source_id = change.source_id,
            "Dropping change without user id or modification time"
        );
        return Ok(None);
    };

    if change.activity_label.is_none() && kind == NotifiableChange::Edit {
        let adds = lookup
            .count_existing_by_action(
                &user_id,
                change.window_start,
                change.parent_kind,
                NotifiableChange::Add,
            )
            .await?;
        if adds > 0 {
            return Ok(None);
        }
        kind = NotifiableChange::Add;
    }

    let existing = lookup
        .count_existing(
            &user_id,
            change.window_start,
            change.parent_kind,
            shift_modified_at,
        )
        .await?;
    if existing > 0 {
        tracing::warn!(
            user_id = %user_id,
            %shift_modified_at,
            "Change already recorded, skipping"
        );
        return Ok(None);
    }

    Ok(Some(ShiftChange {
        user_id,
        shift_modified_at,
        window_start: change.window_start,
        window_end: change.window_end,
        activity_label: change.activity_label,
        parent_kind: change.parent_kind,
        change_kind: kind,
    }))
}
