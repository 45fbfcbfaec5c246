//! Data store seam for the execution engine.
//!
//! The engine only sees these traits. `PgStore` backs them with the domain
//! query functions; tests use the in-memory `MemoryStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::automations::MalformedAutomation;
use crate::domain::{
    AccountCredential, Automation, Image, NewHistoryEntry, Phrase, accounts, automations, history,
    library,
};
use crate::error::StoreError;

/// Keyed-record access to automations, content library and history
#[async_trait]
pub trait AutomationStore: Send + Sync {
    /// Active automations; a row that cannot be read is an `Err` in its slot
    async fn list_active_automations(
        &self,
    ) -> Result<Vec<Result<Automation, MalformedAutomation>>, StoreError>;

    async fn get_automation(&self, automation_id: Uuid) -> Result<Option<Automation>, StoreError>;

    async fn list_phrases(
        &self,
        user_id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Vec<Phrase>, StoreError>;

    async fn get_phrase(&self, phrase_id: Uuid) -> Result<Option<Phrase>, StoreError>;

    async fn list_images(&self, user_id: Uuid) -> Result<Vec<Image>, StoreError>;

    async fn get_image(&self, image_id: Uuid) -> Result<Option<Image>, StoreError>;

    async fn get_images_by_ids(&self, image_ids: &[Uuid]) -> Result<Vec<Image>, StoreError>;

    async fn hash_posted_since(
        &self,
        user_id: Uuid,
        content_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Conditional update: applies only while `last_posted_at` still equals `expected`
    async fn advance_last_posted_at(
        &self,
        automation_id: Uuid,
        expected: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn insert_history(&self, entry: &NewHistoryEntry) -> Result<Uuid, StoreError>;

    async fn latest_account_error(&self, account_id: Uuid) -> Result<Option<String>, StoreError>;
}

/// Black-box lookup of platform credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn account_credential(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AccountCredential>, StoreError>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AutomationStore for PgStore {
    async fn list_active_automations(
        &self,
    ) -> Result<Vec<Result<Automation, MalformedAutomation>>, StoreError> {
        Ok(automations::list_active_automations(&self.pool).await?)
    }

    async fn get_automation(&self, automation_id: Uuid) -> Result<Option<Automation>, StoreError> {
        Ok(automations::get_automation(&self.pool, automation_id).await?)
    }

    async fn list_phrases(
        &self,
        user_id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Vec<Phrase>, StoreError> {
        Ok(library::list_phrases(&self.pool, user_id, folder_id).await?)
    }

    async fn get_phrase(&self, phrase_id: Uuid) -> Result<Option<Phrase>, StoreError> {
        Ok(library::get_phrase(&self.pool, phrase_id).await?)
    }

    async fn list_images(&self, user_id: Uuid) -> Result<Vec<Image>, StoreError> {
        Ok(library::list_images(&self.pool, user_id).await?)
    }

    async fn get_image(&self, image_id: Uuid) -> Result<Option<Image>, StoreError> {
        Ok(library::get_image(&self.pool, image_id).await?)
    }

    async fn get_images_by_ids(&self, image_ids: &[Uuid]) -> Result<Vec<Image>, StoreError> {
        Ok(library::get_images_by_ids(&self.pool, image_ids).await?)
    }

    async fn hash_posted_since(
        &self,
        user_id: Uuid,
        content_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(history::hash_posted_since(&self.pool, user_id, content_hash, since).await?)
    }

    async fn advance_last_posted_at(
        &self,
        automation_id: Uuid,
        expected: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(automations::advance_last_posted_at(&self.pool, automation_id, expected, now).await?)
    }

    async fn insert_history(&self, entry: &NewHistoryEntry) -> Result<Uuid, StoreError> {
        Ok(history::insert_history(&self.pool, entry).await?)
    }

    async fn latest_account_error(&self, account_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(history::latest_account_error(&self.pool, account_id).await?)
    }
}

#[async_trait]
impl CredentialProvider for PgStore {
    async fn account_credential(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AccountCredential>, StoreError> {
        Ok(accounts::get_account_credential(&self.pool, account_id, user_id).await?)
    }
}
