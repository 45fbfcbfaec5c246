//! History recorder - best-effort append to the audit log

use crate::domain::NewHistoryEntry;
use crate::store::AutomationStore;

/// Append one audit row. A failed write is logged and swallowed: by the time
/// we record, the outcome has already happened on the platform.
pub async fn record(store: &dyn AutomationStore, entry: NewHistoryEntry) {
    match store.insert_history(&entry).await {
        Ok(id) => {
            tracing::debug!(history_id = %id, account_id = %entry.account_id, "history recorded");
        }
        Err(e) => {
            tracing::error!(
                account_id = %entry.account_id,
                threads_post_id = ?entry.threads_post_id,
                error = %e,
                "failed to record post history"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::PostType;
    use crate::store::memory::MemoryStore;

    fn entry() -> NewHistoryEntry {
        NewHistoryEntry {
            user_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            phrase_id: None,
            content: "hello".to_string(),
            image_urls: vec![],
            post_type: PostType::Text,
            threads_post_id: Some("17890".to_string()),
            posted_at: Utc::now(),
            content_hash: "abc".to_string(),
            duplicate_skipped: false,
            error_message: None,
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn identical_entries_append_two_rows() {
        let store = MemoryStore::new();
        let e = entry();

        record(&store, e.clone()).await;
        record(&store, e.clone()).await;

        assert_eq!(store.history(), vec![e.clone(), e]);
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let store = MemoryStore::new();
        store.fail_history_writes(true);

        record(&store, entry()).await;

        assert!(store.history().is_empty());
    }
}
