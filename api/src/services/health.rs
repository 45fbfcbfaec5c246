//! Automation health: broken references and the latest recorded failure

use serde::Serialize;

use crate::domain::Automation;
use crate::error::StoreError;
use crate::models::PostType;
use crate::store::AutomationStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationHealth {
    pub has_missing_phrase: bool,
    pub has_missing_images: bool,
    pub last_error: Option<String>,
}

pub async fn automation_health(
    store: &dyn AutomationStore,
    automation: &Automation,
) -> Result<AutomationHealth, StoreError> {
    let has_missing_phrase = match automation.specific_phrase_id {
        Some(phrase_id) if !automation.use_random_phrase => {
            store.get_phrase(phrase_id).await?.is_none()
        }
        _ => false,
    };

    let has_missing_images = match automation.specific_image_id {
        Some(image_id) if automation.post_type == PostType::Image && !automation.use_random_image => {
            store.get_image(image_id).await?.is_none()
        }
        _ => false,
    };

    let last_error = store.latest_account_error(automation.account_id).await?;

    Ok(AutomationHealth {
        has_missing_phrase,
        has_missing_images,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::NewHistoryEntry;
    use crate::domain::automations::fixtures::text_automation;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn healthy_automation_has_no_flags() {
        let store = MemoryStore::new();
        let automation = text_automation(Uuid::new_v4());

        let health = automation_health(&store, &automation).await.unwrap();

        assert_eq!(health, AutomationHealth::default());
    }

    #[tokio::test]
    async fn deleted_specific_references_are_flagged() {
        let store = MemoryStore::new();
        let mut automation = text_automation(Uuid::new_v4());
        automation.post_type = PostType::Image;
        automation.use_random_phrase = false;
        automation.specific_phrase_id = Some(Uuid::new_v4());
        automation.specific_image_id = Some(Uuid::new_v4());

        let health = automation_health(&store, &automation).await.unwrap();

        assert!(health.has_missing_phrase);
        assert!(health.has_missing_images);
    }

    #[tokio::test]
    async fn random_sources_ignore_stale_specific_ids() {
        let store = MemoryStore::new();
        let mut automation = text_automation(Uuid::new_v4());
        automation.specific_phrase_id = Some(Uuid::new_v4());

        let health = automation_health(&store, &automation).await.unwrap();

        assert!(!health.has_missing_phrase);
    }

    #[tokio::test]
    async fn last_error_comes_from_newest_account_row() {
        let store = MemoryStore::new();
        let automation = text_automation(Uuid::new_v4());
        let now = Utc::now();
        let row = |minutes_ago: i64, error: Option<&str>| NewHistoryEntry {
            user_id: automation.user_id,
            account_id: automation.account_id,
            phrase_id: None,
            content: "x".to_string(),
            image_urls: vec![],
            post_type: PostType::Text,
            threads_post_id: None,
            posted_at: now - chrono::Duration::minutes(minutes_ago),
            content_hash: "h".to_string(),
            duplicate_skipped: false,
            error_message: error.map(str::to_string),
            attempts: 3,
        };
        store.insert_history(&row(30, Some("old failure"))).await.unwrap();
        store.insert_history(&row(5, Some("token expired"))).await.unwrap();

        let health = automation_health(&store, &automation).await.unwrap();

        assert_eq!(health.last_error.as_deref(), Some("token expired"));
    }
}
