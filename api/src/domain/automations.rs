//! Automation domain - periodic post configuration and its due-time bookkeeping
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::PostType;

/// A recurring post definition (`periodic_posts` row)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub title: String,
    pub interval_minutes: i32,
    pub post_type: PostType,
    pub is_active: bool,
    pub last_posted_at: Option<DateTime<Utc>>,
    pub use_random_phrase: bool,
    pub specific_phrase_id: Option<Uuid>,
    pub random_phrase_folder_id: Option<Uuid>,
    pub use_random_image: bool,
    pub specific_image_id: Option<Uuid>,
    pub carousel_image_ids: Option<Vec<Uuid>>,
    pub use_intelligent_delay: bool,
}

impl Automation {
    /// Whether the configured interval has elapsed since the last attempt.
    /// Automations that never posted are always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_posted_at {
            Some(last) => now - last >= Duration::minutes(i64::from(self.interval_minutes)),
            None => true,
        }
    }

    /// Whether this cycle needs a phrase as text or caption
    pub fn wants_text(&self) -> bool {
        self.post_type != PostType::Image
            || self.use_random_phrase
            || self.specific_phrase_id.is_some()
    }
}

/// An active row whose post type this engine cannot handle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("automation {id} has unknown post type {post_type:?}")]
pub struct MalformedAutomation {
    pub id: Uuid,
    pub title: String,
    pub post_type: String,
}

/// Row as stored; `post_type` is decoded per row so one bad value stays local
#[derive(sqlx::FromRow)]
struct AutomationRow {
    id: Uuid,
    user_id: Uuid,
    account_id: Uuid,
    campaign_id: Option<Uuid>,
    title: String,
    interval_minutes: i32,
    post_type: String,
    is_active: bool,
    last_posted_at: Option<DateTime<Utc>>,
    use_random_phrase: bool,
    specific_phrase_id: Option<Uuid>,
    random_phrase_folder_id: Option<Uuid>,
    use_random_image: bool,
    specific_image_id: Option<Uuid>,
    carousel_image_ids: Option<Vec<Uuid>>,
    use_intelligent_delay: bool,
}

impl TryFrom<AutomationRow> for Automation {
    type Error = MalformedAutomation;

    fn try_from(row: AutomationRow) -> Result<Self, Self::Error> {
        let Some(post_type) = PostType::parse(&row.post_type) else {
            return Err(MalformedAutomation {
                id: row.id,
                title: row.title,
                post_type: row.post_type,
            });
        };

        Ok(Automation {
            id: row.id,
            user_id: row.user_id,
            account_id: row.account_id,
            campaign_id: row.campaign_id,
            title: row.title,
            interval_minutes: row.interval_minutes,
            post_type,
            is_active: row.is_active,
            last_posted_at: row.last_posted_at,
            use_random_phrase: row.use_random_phrase,
            specific_phrase_id: row.specific_phrase_id,
            random_phrase_folder_id: row.random_phrase_folder_id,
            use_random_image: row.use_random_image,
            specific_image_id: row.specific_image_id,
            carousel_image_ids: row.carousel_image_ids,
            use_intelligent_delay: row.use_intelligent_delay,
        })
    }
}

const AUTOMATION_COLUMNS: &str = r#"
    id, user_id, account_id, campaign_id, title, interval_minutes,
    COALESCE(post_type::text, 'text') AS post_type,
    COALESCE(is_active, false) AS is_active,
    last_posted_at,
    COALESCE(use_random_phrase, false) AS use_random_phrase,
    specific_phrase_id, random_phrase_folder_id,
    COALESCE(use_random_image, false) AS use_random_image,
    specific_image_id, carousel_image_ids,
    COALESCE(use_intelligent_delay, false) AS use_intelligent_delay
"#;

/// List every active automation, oldest first.
/// Rows with an unknown post type come back as `Err` in place.
pub async fn list_active_automations<'e, E>(
    executor: E,
) -> Result<Vec<Result<Automation, MalformedAutomation>>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {AUTOMATION_COLUMNS} FROM periodic_posts WHERE is_active = true ORDER BY created_at ASC"
    );

    let rows: Vec<AutomationRow> = sqlx::query_as(&query).fetch_all(executor).await?;
    Ok(rows.into_iter().map(Automation::try_from).collect())
}

/// Get an automation by ID regardless of its active flag
pub async fn get_automation<'e, E>(
    executor: E,
    automation_id: Uuid,
) -> Result<Option<Automation>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {AUTOMATION_COLUMNS} FROM periodic_posts WHERE id = $1");

    let row: Option<AutomationRow> = sqlx::query_as(&query)
        .bind(automation_id)
        .fetch_optional(executor)
        .await?;

    row.map(Automation::try_from)
        .transpose()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Advance `last_posted_at` only if it still holds the value the caller read.
/// Returns true if the update was applied, false if another invocation got there first.
pub async fn advance_last_posted_at<'e, E>(
    executor: E,
    automation_id: Uuid,
    expected: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE periodic_posts
        SET last_posted_at = $2, updated_at = NOW()
        WHERE id = $1 AND last_posted_at IS NOT DISTINCT FROM $3
        "#,
    )
    .bind(automation_id)
    .bind(now)
    .bind(expected)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An active text automation posting a random phrase every 10 minutes
    pub fn text_automation(user_id: Uuid) -> Automation {
        Automation {
            id: Uuid::new_v4(),
            user_id,
            account_id: Uuid::new_v4(),
            campaign_id: None,
            title: "Daily quotes".to_string(),
            interval_minutes: 10,
            post_type: PostType::Text,
            is_active: true,
            last_posted_at: None,
            use_random_phrase: true,
            specific_phrase_id: None,
            random_phrase_folder_id: None,
            use_random_image: false,
            specific_image_id: None,
            carousel_image_ids: None,
            use_intelligent_delay: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::text_automation;
    use super::*;

    #[test]
    fn never_posted_automation_is_due() {
        let automation = text_automation(Uuid::new_v4());
        assert!(automation.is_due(Utc::now()));
    }

    #[test]
    fn automation_inside_interval_is_not_due() {
        let now = Utc::now();
        let mut automation = text_automation(Uuid::new_v4());
        automation.last_posted_at = Some(now - Duration::minutes(9));
        assert!(!automation.is_due(now));

        automation.last_posted_at = Some(now - Duration::minutes(10));
        assert!(automation.is_due(now));
    }

    #[test]
    fn image_post_without_phrase_source_skips_text() {
        let mut automation = text_automation(Uuid::new_v4());
        automation.post_type = PostType::Image;
        automation.use_random_phrase = false;
        assert!(!automation.wants_text());

        automation.specific_phrase_id = Some(Uuid::new_v4());
        assert!(automation.wants_text());

        automation.post_type = PostType::Carousel;
        automation.specific_phrase_id = None;
        assert!(automation.wants_text());
    }

    fn row(post_type: &str) -> AutomationRow {
        let a = text_automation(Uuid::new_v4());
        AutomationRow {
            id: a.id,
            user_id: a.user_id,
            account_id: a.account_id,
            campaign_id: None,
            title: a.title,
            interval_minutes: a.interval_minutes,
            post_type: post_type.to_string(),
            is_active: true,
            last_posted_at: None,
            use_random_phrase: true,
            specific_phrase_id: None,
            random_phrase_folder_id: None,
            use_random_image: false,
            specific_image_id: None,
            carousel_image_ids: None,
            use_intelligent_delay: false,
        }
    }

    #[test]
    fn unknown_post_type_row_is_reported_not_decoded() {
        assert_eq!(
            Automation::try_from(row("carousel")).unwrap().post_type,
            PostType::Carousel
        );

        let err = Automation::try_from(row("video")).unwrap_err();
        assert_eq!(err.post_type, "video");
        assert_eq!(err.title, "Daily quotes");
    }
}
