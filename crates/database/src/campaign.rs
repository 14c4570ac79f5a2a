//! Campaign CRUD operations.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{map_insert_error, DatabaseError, Result};
use crate::models::{Campaign, CampaignUpdate, NewCampaign};

const CAMPAIGN_COLUMNS: &str = "id, name, template_id, audience_filters, status, \
     estimated_recipients, processed_count, success_count, failed_count, \
     started_at, completed_at, last_updated_at, error_message";

/// Create a new campaign in `pending`.
pub async fn create_campaign(pool: &SqlitePool, campaign: &NewCampaign) -> Result<Campaign> {
    sqlx::query(
        r#"
        INSERT INTO campaigns (id, name, template_id, audience_filters, estimated_recipients)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&campaign.id)
    .bind(&campaign.name)
    .bind(&campaign.template_id)
    .bind(&campaign.audience_filters)
    .bind(campaign.estimated_recipients)
    .execute(pool)
    .await
    .map_err(|e| map_insert_error(e, "Campaign", &campaign.id))?;

    get_campaign(pool, &campaign.id).await
}

/// Get a campaign by ID.
pub async fn get_campaign(pool: &SqlitePool, id: &str) -> Result<Campaign> {
    let sql = format!("SELECT {} FROM campaigns WHERE id = ?", CAMPAIGN_COLUMNS);
    sqlx::query_as::<_, Campaign>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Campaign",
            id: id.to_string(),
        })
}

/// List campaigns, most recent first.
pub async fn list_campaigns(pool: &SqlitePool) -> Result<Vec<Campaign>> {
    let sql = format!(
        "SELECT {} FROM campaigns ORDER BY created_at DESC, id",
        CAMPAIGN_COLUMNS
    );
    let campaigns = sqlx::query_as::<_, Campaign>(&sql).fetch_all(pool).await?;
    Ok(campaigns)
}

/// Apply a partial update and return the stored document.
///
/// There is no version check: concurrent writers follow last-write-wins.
pub async fn update_campaign(
    pool: &SqlitePool,
    id: &str,
    update: &CampaignUpdate,
) -> Result<Campaign> {
    if update.is_empty() {
        return get_campaign(pool, id).await;
    }

    let mut query = QueryBuilder::<Sqlite>::new("UPDATE campaigns SET ");
    let mut set = query.separated(", ");
    if let Some(status) = update.status {
        set.push("status = ");
        set.push_bind_unseparated(status.as_str());
    }
    if let Some(count) = update.processed_count {
        set.push("processed_count = ");
        set.push_bind_unseparated(count);
    }
    if let Some(count) = update.success_count {
        set.push("success_count = ");
        set.push_bind_unseparated(count);
    }
    if let Some(count) = update.failed_count {
        set.push("failed_count = ");
        set.push_bind_unseparated(count);
    }
    if let Some(at) = update.started_at {
        set.push("started_at = ");
        set.push_bind_unseparated(at);
    }
    if let Some(at) = update.completed_at {
        set.push("completed_at = ");
        set.push_bind_unseparated(at);
    }
    if let Some(at) = update.last_updated_at {
        set.push("last_updated_at = ");
        set.push_bind_unseparated(at);
    }
    if let Some(ref message) = update.error_message {
        set.push("error_message = ");
        set.push_bind_unseparated(message.clone());
    }
    query.push(" WHERE id = ");
    query.push_bind(id.to_string());

    let result = query.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Campaign",
            id: id.to_string(),
        });
    }

    get_campaign(pool, id).await
}
