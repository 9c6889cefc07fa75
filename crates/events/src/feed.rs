//! On-demand listing of a user's notifications.
//!
//! The feed renders stored rows as plain sentences (no bullet, with the
//! trailing activity clause) over a window of whole days, and by default
//! marks what it returns as processed so the next delivery run does not
//! send it again.

use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use shiftwatch_core::description::render;
use shiftwatch_core::kinds::Channel;
use shiftwatch_core::ports::NotificationStore;
use shiftwatch_core::types::{DbId, LocalTimestamp};
use shiftwatch_core::{Clock, CoreError};

/// Default number of months covered when only one bound is given.
pub const DEFAULT_MONTHS: u32 = 3;

/// Optional parameters of a feed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Defaults to `false`.
    pub unprocessed_only: Option<bool>,
    /// Defaults to `true`.
    pub process_on_read: Option<bool>,
}

/// One rendered feed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub description: String,
    pub shift_modified: LocalTimestamp,
}

// ---------------------------------------------------------------------------
// NotificationFeed
// ---------------------------------------------------------------------------

pub struct NotificationFeed {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
    months: u32,
}

impl NotificationFeed {
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>, months: u32) -> Self {
        Self {
            store,
            clock,
            months,
        }
    }

    /// Rendered notifications for `user_id` within the query's window.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        query: &FeedQuery,
    ) -> Result<Vec<FeedEntry>, CoreError> {
        let today = self.clock.today();
        let (from, to) = window(query.from, query.to, today, self.months)?;
        let unprocessed_only = query.unprocessed_only.unwrap_or(false);
        let process_on_read = query.process_on_read.unwrap_or(true);

        let rows: Vec<_> = self
            .store
            .find_for_user(user_id, from, to)
            .await?
            .into_iter()
            .filter(|n| !unprocessed_only || !n.processed)
            .collect();
        tracing::debug!(user_id, %from, %to, count = rows.len(), unprocessed_only, "Feed rows found");

        let mut entries: Vec<FeedEntry> = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = FeedEntry {
                description: render(&row.change, Channel::None, today),
                shift_modified: row.change.shift_modified_at,
            };
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        if process_on_read {
            let ids: Vec<DbId> = rows.iter().filter(|n| !n.processed).map(|n| n.id).collect();
            self.store.mark_processed(&ids).await?;
        }

        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Inclusive date bounds for a feed request.
///
/// - `from` defaults to the first day of the month `months` before `to`
///   when `to` is given, else to the first day of the current month.
/// - `to` defaults to the last day of the month `months` after `from`.
pub fn window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
    months: u32,
) -> Result<(NaiveDate, NaiveDate), CoreError> {
    let from = match (from, to) {
        (Some(from), _) => from,
        (None, Some(to)) => first_of_month(shift_months(to, months, false)?),
        (None, None) => first_of_month(today),
    };
    let to = match to {
        Some(to) => to,
        None => last_of_month(shift_months(from, months, true)?)?,
    };
    Ok((from, to))
}

fn shift_months(date: NaiveDate, months: u32, forward: bool) -> Result<NaiveDate, CoreError> {
    let shifted = if forward {
        date.checked_add_months(Months::new(months))
    } else {
        date.checked_sub_months(Months::new(months))
    };
    shifted.ok_or_else(|| CoreError::Validation(format!("Date out of range: {date}")))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> Result<NaiveDate, CoreError> {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| CoreError::Validation(format!("Date out of range: {date}")))
}
