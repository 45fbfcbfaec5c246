//! Periodic post scheduling loop.
//!
//! One invocation walks every active automation in order and folds each into
//! an `ExecutionReport`. Each automation reads the clock when its turn
//! comes. Invocations may overlap (cron tick plus manual
//! trigger); the conditional `last_posted_at` update decides which one owns a
//! given cycle.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{
    DEDUP_WINDOW_MINUTES, DUPLICATE_SKIP_MESSAGE, INTELLIGENT_DELAY_MAX_SECS,
    INTELLIGENT_DELAY_MIN_SECS,
};
use crate::domain::{Automation, NewHistoryEntry};
use crate::error::{CycleError, PostNowError, StoreError};
use crate::models::ResolvedContent;
use crate::services::dedup::{content_fingerprint, is_duplicate};
use crate::services::history;
use crate::services::resolver::resolve_content;
use crate::services::retry::RetryPolicy;
use crate::services::threads::{PublishRequest, PublishedPost, Publisher};
use crate::store::AutomationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub dedup_window: chrono::Duration,
    /// Seconds of random delay before publishing, for automations that ask for it
    pub jitter_secs: RangeInclusive<u64>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            dedup_window: chrono::Duration::minutes(DEDUP_WINDOW_MINUTES),
            jitter_secs: INTELLIGENT_DELAY_MIN_SECS..=INTELLIGENT_DELAY_MAX_SECS,
        }
    }
}

/// What happened to one automation during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ExecutionOutcome {
    NotDue,
    ResolutionSkipped { reason: String },
    DuplicateSkipped,
    Superseded,
    Published { threads_post_id: String, attempts: u32 },
    Failed { error: String, attempts: u32 },
    Errored { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub automation_id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

/// Source of "now" for due checks and bookkeeping
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct PostScheduler {
    store: Arc<dyn AutomationStore>,
    publisher: Arc<dyn Publisher>,
    policy: RetryPolicy,
    options: SchedulerOptions,
    clock: Arc<dyn Clock>,
}

impl PostScheduler {
    pub fn new(
        store: Arc<dyn AutomationStore>,
        publisher: Arc<dyn Publisher>,
        policy: RetryPolicy,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            store,
            publisher,
            policy,
            options,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Process every active automation once.
    /// Only failing to list automations aborts the cycle.
    pub async fn run_cycle(&self) -> Result<Vec<ExecutionReport>, StoreError> {
        let rows = self.store.list_active_automations().await?;
        tracing::info!(count = rows.len(), "running periodic post cycle");

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            let automation = match row {
                Ok(automation) => automation,
                Err(malformed) => {
                    tracing::error!(automation_id = %malformed.id, post_type = %malformed.post_type, "unreadable automation row");
                    reports.push(ExecutionReport {
                        automation_id: malformed.id,
                        title: malformed.title.clone(),
                        outcome: ExecutionOutcome::Errored {
                            error: malformed.to_string(),
                        },
                    });
                    continue;
                }
            };

            let now = self.clock.now();
            let outcome = match self.process(&automation, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(automation_id = %automation.id, error = %e, "automation processing failed");
                    ExecutionOutcome::Errored {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(ExecutionReport {
                automation_id: automation.id,
                title: automation.title,
                outcome,
            });
        }

        let published = reports
            .iter()
            .filter(|r| matches!(r.outcome, ExecutionOutcome::Published { .. }))
            .count();
        tracing::info!(processed = reports.len(), published, "periodic post cycle finished");

        Ok(reports)
    }

    /// `now` is the single timestamp for this automation's due check, dedup
    /// window, claim and history rows
    async fn process(
        &self,
        automation: &Automation,
        now: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, StoreError> {
        if !automation.is_due(now) {
            return Ok(ExecutionOutcome::NotDue);
        }

        let content = match resolve_content(self.store.as_ref(), automation).await {
            Ok(content) => content,
            Err(CycleError::Resolution(reason)) => {
                tracing::warn!(automation_id = %automation.id, %reason, "skipping automation");
                return Ok(ExecutionOutcome::ResolutionSkipped {
                    reason: reason.to_string(),
                });
            }
            Err(CycleError::Store(e)) => return Err(e),
        };

        let fingerprint = content_fingerprint(automation.post_type, &content);

        if is_duplicate(
            self.store.as_ref(),
            automation.user_id,
            &fingerprint,
            self.options.dedup_window,
            now,
        )
        .await?
        {
            tracing::info!(automation_id = %automation.id, "identical content posted recently, skipping");
            let entry = history_entry(automation, &content, fingerprint, now);
            history::record(
                self.store.as_ref(),
                NewHistoryEntry {
                    duplicate_skipped: true,
                    error_message: Some(DUPLICATE_SKIP_MESSAGE.to_string()),
                    attempts: 0,
                    ..entry
                },
            )
            .await;
            return Ok(ExecutionOutcome::DuplicateSkipped);
        }

        // Claim this cycle before publishing
        let claimed = self
            .store
            .advance_last_posted_at(automation.id, automation.last_posted_at, now)
            .await?;
        if !claimed {
            tracing::info!(automation_id = %automation.id, "cycle claimed by another invocation");
            return Ok(ExecutionOutcome::Superseded);
        }

        if automation.use_intelligent_delay {
            let secs = rand::rng().random_range(self.options.jitter_secs.clone());
            tracing::debug!(automation_id = %automation.id, delay_secs = secs, "intelligent delay");
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }

        let request = PublishRequest {
            user_id: automation.user_id,
            account_id: automation.account_id,
            post_type: automation.post_type,
            text: content.text.clone(),
            image_urls: content.image_urls.clone(),
        };

        let outcome = self
            .policy
            .run(
                |_| self.publisher.publish(&request),
                |attempt, e| {
                    tracing::warn!(
                        automation_id = %automation.id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "publish attempt failed"
                    );
                },
            )
            .await;

        let entry = history_entry(automation, &content, fingerprint, now);
        match outcome.result {
            Ok(post) => {
                tracing::info!(
                    automation_id = %automation.id,
                    threads_post_id = %post.post_id,
                    attempts = outcome.attempts,
                    "periodic post published"
                );
                history::record(
                    self.store.as_ref(),
                    NewHistoryEntry {
                        threads_post_id: Some(post.post_id.clone()),
                        attempts: outcome.attempts as i32,
                        ..entry
                    },
                )
                .await;
                Ok(ExecutionOutcome::Published {
                    threads_post_id: post.post_id,
                    attempts: outcome.attempts,
                })
            }
            Err(e) => {
                tracing::error!(automation_id = %automation.id, error = %e, "periodic post failed after retries");
                history::record(
                    self.store.as_ref(),
                    NewHistoryEntry {
                        error_message: Some(e.message.clone()),
                        attempts: self.policy.max_attempts as i32,
                        ..entry
                    },
                )
                .await;
                Ok(ExecutionOutcome::Failed {
                    error: e.message,
                    attempts: outcome.attempts,
                })
            }
        }
    }

    /// Publish an automation's content once, outside the schedule.
    /// Leaves `last_posted_at` and history untouched.
    pub async fn post_now(&self, automation_id: Uuid) -> Result<PublishedPost, PostNowError> {
        let automation = self
            .store
            .get_automation(automation_id)
            .await
            .map_err(CycleError::from)?
            .ok_or(PostNowError::NotFound)?;

        let content = resolve_content(self.store.as_ref(), &automation).await?;

        let request = PublishRequest {
            user_id: automation.user_id,
            account_id: automation.account_id,
            post_type: automation.post_type,
            text: content.text,
            image_urls: content.image_urls,
        };
        let post = self.publisher.publish(&request).await?;

        tracing::info!(automation_id = %automation.id, threads_post_id = %post.post_id, "manual post published");
        Ok(post)
    }
}

fn history_entry(
    automation: &Automation,
    content: &ResolvedContent,
    fingerprint: String,
    posted_at: DateTime<Utc>,
) -> NewHistoryEntry {
    NewHistoryEntry {
        user_id: automation.user_id,
        account_id: automation.account_id,
        phrase_id: content.phrase_id.or(automation.specific_phrase_id),
        content: content.text.clone(),
        image_urls: content.image_urls.clone(),
        post_type: automation.post_type,
        threads_post_id: None,
        posted_at,
        content_hash: fingerprint,
        duplicate_skipped: false,
        error_message: None,
        attempts: 0,
    }
}
