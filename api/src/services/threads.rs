//! Threads Graph API publishing.
//!
//! Publishing is two-phase: create a media container, wait for the platform
//! to process it, then publish the container. Carousels create one child
//! container per image before the parent. Any non-success response fails the
//! whole attempt; retries belong to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CAROUSEL_MAX_IMAGES, CAROUSEL_MIN_IMAGES};
use crate::domain::AccountCredential;
use crate::error::{PublishError, PublishErrorKind};
use crate::models::PostType;
use crate::store::CredentialProvider;

/// Content to publish for one account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub post_type: PostType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl PublishRequest {
    /// Reject content the platform would refuse for this post type
    pub fn validate(&self) -> Result<(), PublishError> {
        match self.post_type {
            PostType::Text if self.text.trim().is_empty() => {
                Err(PublishError::invalid("text is required for text posts"))
            }
            PostType::Image if self.image_urls.is_empty() => {
                Err(PublishError::invalid("an image is required for image posts"))
            }
            PostType::Carousel
                if !(CAROUSEL_MIN_IMAGES..=CAROUSEL_MAX_IMAGES).contains(&self.image_urls.len()) =>
            {
                Err(PublishError::invalid(format!(
                    "carousel requires between {CAROUSEL_MIN_IMAGES} and {CAROUSEL_MAX_IMAGES} images, got {}",
                    self.image_urls.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A published post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPost {
    pub post_id: String,
    pub creation_id: String,
}

/// The single "create post" operation the engine depends on.
/// One call is one attempt.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost, PublishError>;
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum MediaType {
    Text,
    Image,
    Carousel,
}

const EXTERNAL_UPLOAD: &str = "external";

#[derive(Debug, Serialize)]
struct ContainerRequest<'a> {
    media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    /// "external" for media fetched by the platform from `image_url`
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_carousel_item: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct PublishContainerRequest<'a> {
    creation_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Clone)]
pub struct ThreadsClient {
    api_base: String,
    settle_delay: Duration,
    http: Client,
}

impl ThreadsClient {
    pub fn new(api_base: &str, settle_delay: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            settle_delay,
            http: Client::new(),
        }
    }

    /// Create the container(s) for a post, wait for processing, then publish it
    pub async fn publish(
        &self,
        credential: &AccountCredential,
        post_type: PostType,
        text: &str,
        image_urls: &[String],
    ) -> Result<PublishedPost, PublishError> {
        let caption = (!text.is_empty()).then_some(text);

        let creation_id = match post_type {
            PostType::Text => {
                let body = ContainerRequest {
                    media_type: MediaType::Text,
                    text: Some(text),
                    image_url: None,
                    upload_type: None,
                    is_carousel_item: None,
                    children: None,
                };
                self.create_container(credential, &body, "text container").await?
            }
            PostType::Image => {
                let image_url = image_urls
                    .first()
                    .ok_or_else(|| PublishError::invalid("an image is required for image posts"))?;
                let body = ContainerRequest {
                    media_type: MediaType::Image,
                    text: caption,
                    image_url: Some(image_url),
                    upload_type: Some(EXTERNAL_UPLOAD),
                    is_carousel_item: None,
                    children: None,
                };
                self.create_container(credential, &body, "image container").await?
            }
            PostType::Carousel => {
                // Children in order; a failed child aborts before the parent exists
                let mut children = Vec::with_capacity(image_urls.len());
                for (index, image_url) in image_urls.iter().enumerate() {
                    let body = ContainerRequest {
                        media_type: MediaType::Image,
                        text: None,
                        image_url: Some(image_url),
                        upload_type: Some(EXTERNAL_UPLOAD),
                        is_carousel_item: Some(true),
                        children: None,
                    };
                    let step = format!("carousel item {}", index + 1);
                    children.push(self.create_container(credential, &body, &step).await?);
                }

                let body = ContainerRequest {
                    media_type: MediaType::Carousel,
                    text: caption,
                    image_url: None,
                    upload_type: None,
                    is_carousel_item: None,
                    children: Some(&children),
                };
                self.create_container(credential, &body, "carousel container").await?
            }
        };

        tracing::debug!(
            creation_id = %creation_id,
            settle_secs = self.settle_delay.as_secs_f32(),
            "container created, waiting before publish"
        );
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let post_id = self.publish_container(credential, &creation_id).await?;

        Ok(PublishedPost {
            post_id,
            creation_id,
        })
    }

    async fn create_container(
        &self,
        credential: &AccountCredential,
        body: &ContainerRequest<'_>,
        step: &str,
    ) -> Result<String, PublishError> {
        let url = format!("{}/{}/threads", self.api_base, credential.account_id);
        self.post_for_id(&url, &credential.access_token, body, step).await
    }

    async fn publish_container(
        &self,
        credential: &AccountCredential,
        creation_id: &str,
    ) -> Result<String, PublishError> {
        let url = format!("{}/{}/threads_publish", self.api_base, credential.account_id);
        let body = PublishContainerRequest { creation_id };
        self.post_for_id(&url, &credential.access_token, &body, "publish")
            .await
    }

    async fn post_for_id<B: Serialize + ?Sized>(
        &self,
        url: &str,
        access_token: &str,
        body: &B,
        step: &str,
    ) -> Result<String, PublishError> {
        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(PublishError::new(
                PublishErrorKind::Api {
                    status: status.as_u16(),
                },
                format!("{} failed - Status {}: {}", step, status, text),
            ));
        }

        let parsed: IdResponse = serde_json::from_str(&text).map_err(|e| {
            PublishError::new(
                PublishErrorKind::Decode,
                format!("Failed to parse {} response: {} - body: {}", step, e, text),
            )
        })?;
        Ok(parsed.id)
    }
}

/// `Publisher` backed by the Threads API and a credential lookup
pub struct ThreadsPublisher {
    client: ThreadsClient,
    credentials: Arc<dyn CredentialProvider>,
}

impl ThreadsPublisher {
    pub fn new(client: ThreadsClient, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl Publisher for ThreadsPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost, PublishError> {
        request.validate()?;

        let credential = self
            .credentials
            .account_credential(request.account_id, request.user_id)
            .await
            .map_err(|e| {
                PublishError::new(PublishErrorKind::Store, format!("credential lookup failed: {e}"))
            })?
            .ok_or_else(|| {
                PublishError::new(
                    PublishErrorKind::MissingAccount,
                    format!("account {} not found", request.account_id),
                )
            })?;

        tracing::info!(
            account_id = %request.account_id,
            username = credential.username.as_deref().unwrap_or("unknown"),
            post_type = %request.post_type,
            images = request.image_urls.len(),
            "publishing post"
        );

        self.client
            .publish(
                &credential,
                request.post_type,
                &request.text,
                &request.image_urls,
            )
            .await
    }
}
