//! Content resolution: picks the phrase and image(s) an automation publishes this cycle.
//!
//! Pure with respect to the store: reads only, never writes.

use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::constants::{CAROUSEL_MAX_IMAGES, CAROUSEL_MIN_IMAGES};
use crate::domain::{Automation, Image};
use crate::error::{CycleError, ResolutionFailure};
use crate::models::{PostType, ResolvedContent};
use crate::store::AutomationStore;

/// Resolve text and image URLs for one cycle of `automation`
pub async fn resolve_content(
    store: &dyn AutomationStore,
    automation: &Automation,
) -> Result<ResolvedContent, CycleError> {
    if automation.interval_minutes <= 0 {
        return Err(ResolutionFailure::InvalidInterval(automation.interval_minutes).into());
    }

    let (text, phrase_id) = if automation.wants_text() {
        resolve_text(store, automation).await?
    } else {
        (String::new(), None)
    };

    if automation.post_type == PostType::Text && text.trim().is_empty() {
        return Err(ResolutionFailure::EmptyText.into());
    }

    let image_urls = match automation.post_type {
        PostType::Text => Vec::new(),
        PostType::Image => resolve_single_image(store, automation).await?,
        PostType::Carousel => resolve_carousel(store, automation).await?,
    };

    Ok(ResolvedContent {
        text,
        image_urls,
        phrase_id,
    })
}

/// Random phrase from the user's pool (optionally one folder) or the configured phrase.
/// An empty pool or a deleted phrase yields empty text.
async fn resolve_text(
    store: &dyn AutomationStore,
    automation: &Automation,
) -> Result<(String, Option<Uuid>), CycleError> {
    if automation.use_random_phrase {
        let phrases = store
            .list_phrases(automation.user_id, automation.random_phrase_folder_id)
            .await?;
        let picked = phrases.choose(&mut rand::rng()).cloned();
        return Ok(picked
            .map(|p| (p.content, Some(p.id)))
            .unwrap_or_default());
    }

    if let Some(phrase_id) = automation.specific_phrase_id {
        let phrase = store.get_phrase(phrase_id).await?;
        return Ok(phrase
            .map(|p| (p.content, Some(p.id)))
            .unwrap_or_default());
    }

    Ok((String::new(), None))
}

async fn resolve_single_image(
    store: &dyn AutomationStore,
    automation: &Automation,
) -> Result<Vec<String>, CycleError> {
    let image = if automation.use_random_image {
        let images = store.list_images(automation.user_id).await?;
        images.choose(&mut rand::rng()).cloned()
    } else if let Some(image_id) = automation.specific_image_id {
        store.get_image(image_id).await?
    } else {
        None
    };

    image
        .map(|i| vec![i.public_url])
        .ok_or_else(|| ResolutionFailure::MissingImage.into())
}

async fn resolve_carousel(
    store: &dyn AutomationStore,
    automation: &Automation,
) -> Result<Vec<String>, CycleError> {
    let ids = automation.carousel_image_ids.as_deref().unwrap_or_default();

    if ids.len() < CAROUSEL_MIN_IMAGES {
        return Err(ResolutionFailure::CarouselTooSmall {
            resolved: ids.len(),
        }
        .into());
    }
    if ids.len() > CAROUSEL_MAX_IMAGES {
        return Err(ResolutionFailure::CarouselTooLarge {
            configured: ids.len(),
        }
        .into());
    }

    let fetched = store.get_images_by_ids(ids).await?;
    let urls = order_by_ids(ids, &fetched);

    if urls.len() < CAROUSEL_MIN_IMAGES {
        return Err(ResolutionFailure::CarouselTooSmall {
            resolved: urls.len(),
        }
        .into());
    }

    Ok(urls)
}

/// URLs of `images` in the order of `ids`, skipping ids that did not resolve
fn order_by_ids(ids: &[Uuid], images: &[Image]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| images.iter().find(|img| img.id == *id))
        .map(|img| img.public_url.clone())
        .collect()
}
