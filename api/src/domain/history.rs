//! Post history domain - the append-only audit log of execution attempts
//!
//! Rows are only ever inserted; nothing here updates or deletes them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::PostType;

/// A stored audit row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostHistoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub phrase_id: Option<Uuid>,
    pub content: String,
    pub image_urls: Vec<String>,
    pub post_type: PostType,
    pub threads_post_id: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub content_hash: Option<String>,
    pub duplicate_skipped: bool,
    pub error_message: Option<String>,
    pub attempts: i32,
}

/// Audit row to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub phrase_id: Option<Uuid>,
    pub content: String,
    pub image_urls: Vec<String>,
    pub post_type: PostType,
    pub threads_post_id: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub content_hash: String,
    pub duplicate_skipped: bool,
    pub error_message: Option<String>,
    pub attempts: i32,
}

pub async fn insert_history<'e, E>(executor: E, entry: &NewHistoryEntry) -> Result<Uuid, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO post_history (
            user_id, account_id, phrase_id, content, image_urls, post_type,
            threads_post_id, posted_at, content_hash, duplicate_skipped,
            error_message, attempts
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.account_id)
    .bind(entry.phrase_id)
    .bind(&entry.content)
    .bind(&entry.image_urls)
    .bind(entry.post_type)
    .bind(entry.threads_post_id.as_deref())
    .bind(entry.posted_at)
    .bind(&entry.content_hash)
    .bind(entry.duplicate_skipped)
    .bind(entry.error_message.as_deref())
    .bind(entry.attempts)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Whether the user published this content hash at or after `since`.
/// Duplicate-skip rows are audit only and never count.
pub async fn hash_posted_since<'e, E>(
    executor: E,
    user_id: Uuid,
    content_hash: &str,
    since: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM post_history
            WHERE user_id = $1 AND content_hash = $2 AND posted_at >= $3
              AND COALESCE(duplicate_skipped, false) = false
        )
        "#,
    )
    .bind(user_id)
    .bind(content_hash)
    .bind(since)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}

/// Newest rows for an account
pub async fn list_account_history<'e, E>(
    executor: E,
    account_id: Uuid,
    limit: i64,
) -> Result<Vec<PostHistoryRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, account_id, phrase_id, content,
               COALESCE(image_urls, '{}') AS image_urls,
               COALESCE(post_type, 'text') AS post_type,
               threads_post_id, posted_at, content_hash,
               COALESCE(duplicate_skipped, false) AS duplicate_skipped,
               error_message,
               COALESCE(attempts, 0) AS attempts
        FROM post_history
        WHERE account_id = $1
        ORDER BY posted_at DESC
        LIMIT $2
        "#,
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Error message of the newest row for an account, if that row failed
pub async fn latest_account_error<'e, E>(
    executor: E,
    account_id: Uuid,
) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(Option<String>,)> = sqlx::query_as(
        r#"
        SELECT error_message FROM post_history
        WHERE account_id = $1
        ORDER BY posted_at DESC
        LIMIT 1
        "#,
    )
    .bind(account_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.and_then(|r| r.0))
}
