//! System settings (key/value) persistence.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::models::Setting;
use crate::Result;

/// Insert or replace a setting.
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO system_settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a single setting, if present.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>(
        r#"
        SELECT value
        FROM system_settings
        WHERE key = ?
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(value)
}

/// Load every setting into a map.
pub async fn load_settings(pool: &SqlitePool) -> Result<HashMap<String, String>> {
    let rows = sqlx::query_as::<_, Setting>(
        r#"
        SELECT key, value
        FROM system_settings
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|s| (s.key, s.value)).collect())
}
