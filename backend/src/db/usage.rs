use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Executor, Postgres, Row};

use super::models::{from_millis, now_millis, NewUsage, UsageRecord};
use super::{StoreError, StoreResult};

pub async fn insert<'c, E>(executor: E, input: &NewUsage) -> StoreResult<UsageRecord>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO usage (user_id, content_url, generated_content, tone, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, content_url, generated_content, tone, created_at
        "#,
    )
    .bind(input.user_id.as_deref())
    .bind(&input.subject_url)
    .bind(input.payload_snapshot.as_deref())
    .bind(input.tone_label.as_deref())
    .bind(now_millis().timestamp_millis())
    .fetch_one(executor)
    .await?;

    map_row(&row)
}

pub async fn list_for_user<'c, E>(
    executor: E,
    user_id: &str,
    limit: i64,
) -> StoreResult<Vec<UsageRecord>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, content_url, generated_content, tone, created_at
        FROM usage
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    rows.iter().map(map_row).collect()
}

pub async fn count_since<'c, E>(
    executor: E,
    user_id: &str,
    since: DateTime<Utc>,
) -> StoreResult<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM usage WHERE user_id = $1 AND created_at > $2",
    )
    .bind(user_id)
    .bind(since.timestamp_millis())
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Serializes writers for one user until the surrounding transaction ends.
pub async fn lock_user<'c, E>(executor: E, user_id: &str) -> StoreResult<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

fn map_row(row: &PgRow) -> StoreResult<UsageRecord> {
    let created_at: i64 = row.try_get("created_at")?;
    Ok(UsageRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        subject_url: row.try_get("content_url")?,
        payload_snapshot: row.try_get("generated_content")?,
        tone_label: row.try_get("tone")?,
        created_at: from_millis(created_at).ok_or_else(|| {
            StoreError::Malformed(format!("usage.created_at out of range: {created_at}"))
        })?,
    })
}
