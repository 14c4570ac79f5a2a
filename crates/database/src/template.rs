//! Message template CRUD operations.

use sqlx::SqlitePool;

use crate::error::{map_insert_error, DatabaseError, Result};
use crate::models::MessageTemplate;

/// Create a new template.
pub async fn create_template(pool: &SqlitePool, template: &MessageTemplate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO message_templates (id, name, body)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&template.id)
    .bind(&template.name)
    .bind(&template.body)
    .execute(pool)
    .await
    .map_err(|e| map_insert_error(e, "Template", &template.id))?;

    Ok(())
}

/// Get a template by ID.
pub async fn get_template(pool: &SqlitePool, id: &str) -> Result<MessageTemplate> {
    sqlx::query_as::<_, MessageTemplate>(
        r#"
        SELECT id, name, body
        FROM message_templates
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Template",
        id: id.to_string(),
    })
}
