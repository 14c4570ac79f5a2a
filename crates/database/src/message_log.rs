//! Message log (delivery ledger) persistence.

use sqlx::SqlitePool;

use crate::models::{MessageLog, NewMessageLog};
use crate::Result;

/// Append a delivery attempt. Returns the new row ID.
pub async fn append_log(pool: &SqlitePool, entry: &NewMessageLog) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO message_logs (
            campaign_id, client_id, client_phone, template_id,
            status, error_message, sent_at, waha_message_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.campaign_id)
    .bind(&entry.client_id)
    .bind(&entry.client_phone)
    .bind(&entry.template_id)
    .bind(entry.status.as_str())
    .bind(&entry.error_message)
    .bind(entry.sent_at)
    .bind(&entry.waha_message_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch one page of a campaign's log, oldest first.
///
/// Pages are zero-based.
pub async fn list_logs_page(
    pool: &SqlitePool,
    campaign_id: &str,
    page: u32,
    page_size: u32,
) -> Result<Vec<MessageLog>> {
    let offset = i64::from(page) * i64::from(page_size);
    let rows = sqlx::query_as::<_, MessageLog>(
        r#"
        SELECT id, campaign_id, client_id, client_phone, template_id,
               status, error_message, sent_at, waha_message_id
        FROM message_logs
        WHERE campaign_id = ?
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(campaign_id)
    .bind(i64::from(page_size))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count log entries for a campaign.
pub async fn count_logs(pool: &SqlitePool, campaign_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM message_logs
        WHERE campaign_id = ?
        "#,
    )
    .bind(campaign_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
