//! Connected account domain - read-only credential lookup

use sqlx::{Executor, Postgres};
use uuid::Uuid;

/// Credential for a connected Threads account. Never mutated here.
#[derive(Clone, sqlx::FromRow)]
pub struct AccountCredential {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Platform user ID used in Graph API paths
    pub account_id: String,
    pub access_token: String,
    pub username: Option<String>,
}

// Keep the token out of logs
impl std::fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredential")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Get the credential for an account owned by the given user
pub async fn get_account_credential<'e, E>(
    executor: E,
    account_id: Uuid,
    user_id: Uuid,
) -> Result<Option<AccountCredential>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, user_id, account_id, access_token, username
        FROM threads_accounts
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(account_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}
