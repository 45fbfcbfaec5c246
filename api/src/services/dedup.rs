//! Duplicate-content guard
//!
//! A fingerprint is the hex SHA-256 of what would be published: the text for
//! text posts, the image URLs for image and carousel posts.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{PostType, ResolvedContent};
use crate::store::AutomationStore;

/// Deterministic dedup key for resolved content
pub fn content_fingerprint(post_type: PostType, content: &ResolvedContent) -> String {
    let material = match post_type {
        PostType::Text => content.text.clone(),
        PostType::Image => content.image_urls.concat(),
        PostType::Carousel => content.image_urls.join("|"),
    };

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether the user already has this fingerprint in history within `window` before `now`
pub async fn is_duplicate(
    store: &dyn AutomationStore,
    user_id: Uuid,
    fingerprint: &str,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    store
        .hash_posted_since(user_id, fingerprint, now - window)
        .await
}
