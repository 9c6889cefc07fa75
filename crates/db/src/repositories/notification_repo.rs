//! Repository for the `notification` table.

use chrono::NaiveDate;
use shiftwatch_core::kinds::{NotifiableChange, ParentKind};
use shiftwatch_core::notification::ShiftChange;
use shiftwatch_core::types::{DbId, LocalTimestamp};
use sqlx::PgPool;

use crate::models::notification::NotificationRow;

/// Column list for `notification` queries.
const COLUMNS: &str = "id, user_id, shift_modified_at, window_start, window_end, \
    activity_label, parent_kind, change_kind, processed";

/// Provides queries over stored notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert every change as an unprocessed row in a single transaction.
    ///
    /// Returns the number of rows written.
    pub async fn insert_all(pool: &PgPool, changes: &[ShiftChange]) -> Result<u64, sqlx::Error> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut written = 0;
        for change in changes {
            let result = sqlx::query(
                "INSERT INTO notification \
                    (user_id, shift_modified_at, window_start, window_end, \
                     activity_label, parent_kind, change_kind, processed) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, false)",
            )
            .bind(&change.user_id)
            .bind(change.shift_modified_at)
            .bind(change.window_start)
            .bind(change.window_end)
            .bind(&change.activity_label)
            .bind(change.parent_kind.as_str())
            .bind(change.change_kind.as_str())
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;

        Ok(written)
    }

    /// All rows not yet delivered, oldest first.
    pub async fn list_unprocessed(pool: &PgPool) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification \
             WHERE processed = false \
             ORDER BY id"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// A user's rows whose modification date lies within `[from, to]`.
    pub async fn list_for_user_between(
        pool: &PgPool,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification \
             WHERE UPPER(user_id) = UPPER($1) \
               AND shift_modified_at >= $2 \
               AND shift_modified_at < $3 \
             ORDER BY shift_modified_at, id"
        );
        let end_exclusive = to.succ_opt().unwrap_or(to);
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .bind(from.and_time(chrono::NaiveTime::MIN))
            .bind(end_exclusive.and_time(chrono::NaiveTime::MIN))
            .fetch_all(pool)
            .await
    }

    /// Count rows matching the idempotency key exactly.
    pub async fn count_existing(
        pool: &PgPool,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        shift_modified_at: LocalTimestamp,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification \
             WHERE UPPER(user_id) = UPPER($1) \
               AND window_start = $2 \
               AND parent_kind = $3 \
               AND shift_modified_at = $4",
        )
        .bind(user_id)
        .bind(window_start)
        .bind(parent_kind.as_str())
        .bind(shift_modified_at)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Count rows for the same shift with the given change kind.
    pub async fn count_existing_by_action(
        pool: &PgPool,
        user_id: &str,
        window_start: LocalTimestamp,
        parent_kind: ParentKind,
        change_kind: NotifiableChange,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification \
             WHERE UPPER(user_id) = UPPER($1) \
               AND window_start = $2 \
               AND parent_kind = $3 \
               AND change_kind = $4",
        )
        .bind(user_id)
        .bind(window_start)
        .bind(parent_kind.as_str())
        .bind(change_kind.as_str())
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Mark the given rows processed.
    ///
    /// Returns the number of rows that changed state. Already-processed rows
    /// are left alone, so repeating the call is harmless.
    pub async fn mark_processed(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE notification \
             SET processed = true \
             WHERE id = ANY($1) AND processed = false",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
