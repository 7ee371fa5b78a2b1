use sqlx::{postgres::PgRow, Executor, Postgres, Row};

use super::models::{from_millis, now_millis, NewUser, Plan, User};
use super::{StoreError, StoreResult};

pub async fn upsert<'c, E>(executor: E, input: &NewUser) -> StoreResult<User>
where
    E: Executor<'c, Database = Postgres>,
{
    let created_at = input.created_at.unwrap_or_else(now_millis);
    let row = sqlx::query(
        r#"
        INSERT INTO users (id, email, plan, stripe_subscription_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id)
        DO UPDATE SET
            email = EXCLUDED.email,
            plan = EXCLUDED.plan,
            stripe_subscription_id = EXCLUDED.stripe_subscription_id
        RETURNING id, email, plan, stripe_subscription_id, created_at
        "#,
    )
    .bind(&input.id)
    .bind(&input.email)
    .bind(input.plan.as_str())
    .bind(input.subscription_ref.as_deref())
    .bind(created_at.timestamp_millis())
    .fetch_one(executor)
    .await?;

    map_row(&row)
}

pub async fn get_by_id<'c, E>(executor: E, id: &str) -> StoreResult<Option<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        SELECT id, email, plan, stripe_subscription_id, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn get_by_email<'c, E>(executor: E, email: &str) -> StoreResult<Option<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        SELECT id, email, plan, stripe_subscription_id, created_at
        FROM users
        WHERE email = $1
        ORDER BY created_at ASC, id ASC
        LIMIT 1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(map_row).transpose()
}

fn map_row(row: &PgRow) -> StoreResult<User> {
    let plan: String = row.try_get("plan")?;
    let created_at: i64 = row.try_get("created_at")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        plan: plan.parse::<Plan>().map_err(StoreError::Malformed)?,
        subscription_ref: row.try_get("stripe_subscription_id")?,
        created_at: from_millis(created_at).ok_or_else(|| {
            StoreError::Malformed(format!("users.created_at out of range: {created_at}"))
        })?,
    })
}
