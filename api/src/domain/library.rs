//! Content library domain - DB queries for phrases and images

use sqlx::{Executor, Postgres};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Phrase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub public_url: String,
}

/// List a user's phrases, optionally restricted to one folder
pub async fn list_phrases<'e, E>(
    executor: E,
    user_id: Uuid,
    folder_id: Option<Uuid>,
) -> Result<Vec<Phrase>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, folder_id, content
        FROM phrases
        WHERE user_id = $1 AND ($2::uuid IS NULL OR folder_id = $2)
        "#,
    )
    .bind(user_id)
    .bind(folder_id)
    .fetch_all(executor)
    .await
}

pub async fn get_phrase<'e, E>(executor: E, phrase_id: Uuid) -> Result<Option<Phrase>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, user_id, folder_id, content FROM phrases WHERE id = $1")
        .bind(phrase_id)
        .fetch_optional(executor)
        .await
}

/// List all of a user's images across folders
pub async fn list_images<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Image>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, user_id, folder_id, public_url FROM images WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(executor)
        .await
}

pub async fn get_image<'e, E>(executor: E, image_id: Uuid) -> Result<Option<Image>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, user_id, folder_id, public_url FROM images WHERE id = $1")
        .bind(image_id)
        .fetch_optional(executor)
        .await
}

/// Fetch images by ID. Row order is unspecified and missing IDs are simply absent.
pub async fn get_images_by_ids<'e, E>(
    executor: E,
    image_ids: &[Uuid],
) -> Result<Vec<Image>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, user_id, folder_id, public_url FROM images WHERE id = ANY($1::uuid[])",
    )
    .bind(image_ids)
    .fetch_all(executor)
    .await
}
