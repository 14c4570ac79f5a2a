//! Client (audience) queries.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{map_insert_error, Result};
use crate::models::Client;

/// Create a new client.
pub async fn create_client(pool: &SqlitePool, client: &Client) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO clients (id, name, phone, tags)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&client.id)
    .bind(&client.name)
    .bind(&client.phone)
    .bind(&client.tags)
    .execute(pool)
    .await
    .map_err(|e| map_insert_error(e, "Client", &client.id))?;

    Ok(())
}

/// List reachable clients (with a phone number), optionally filtered by tags.
///
/// A client matches when any of `tags` appears, case-insensitively, inside its
/// tag list. An empty `tags` slice matches everyone.
pub async fn list_clients(pool: &SqlitePool, tags: &[String], limit: i64) -> Result<Vec<Client>> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT id, name, phone, tags FROM clients WHERE ");
    push_reachable_filter(&mut query, tags);
    query.push(" ORDER BY name, id LIMIT ");
    query.push_bind(limit);

    let clients = query.build_query_as::<Client>().fetch_all(pool).await?;
    Ok(clients)
}

/// Count reachable clients matching the tag filter.
pub async fn count_clients(pool: &SqlitePool, tags: &[String]) -> Result<i64> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM clients WHERE ");
    push_reachable_filter(&mut query, tags);

    let count = query.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

fn push_reachable_filter(query: &mut QueryBuilder<'_, Sqlite>, tags: &[String]) {
    query.push("phone IS NOT NULL AND trim(phone) != ''");

    let tags: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        return;
    }

    query.push(" AND (");
    let mut any = query.separated(" OR ");
    for tag in tags {
        any.push("instr(lower(tags), ");
        any.push_bind_unseparated(tag);
        any.push_unseparated(") > 0");
    }
    query.push(")");
}
