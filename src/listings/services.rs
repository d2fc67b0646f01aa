use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateListingRequest, ListQuery, ListingPage, ModerationRequest, UpdateListingRequest},
    query::{ListingFilter, PageRequest, Pagination, SortKey},
    repo_types::{Category, Counters, Listing, ListingDetails, ListingStatus, Rating},
    validation::{validate_create, validate_update, ListingPatch},
};
use crate::{
    error::{AppError, FieldError},
    state::AppState,
    users::repo_types::{PublicUser, UserSummary},
};

const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 5;

fn not_found() -> AppError {
    AppError::NotFound("Service not found".into())
}

/// Malformed ids cannot name a listing, so they read as missing.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found())
}

async fn owned_listing(state: &AppState, user: &PublicUser, id: &str) -> Result<Listing, AppError> {
    let listing = state
        .listings
        .find_by_id(parse_id(id)?)
        .await?
        .ok_or_else(not_found)?;
    if listing.provider_id != user.id {
        warn!(user_id = %user.id, service_id = %listing.id, "not the owner");
        return Err(AppError::Forbidden(
            "Not authorized to modify this service".into(),
        ));
    }
    Ok(listing)
}

pub async fn create(
    state: &AppState,
    provider: &PublicUser,
    req: CreateListingRequest,
) -> Result<Listing, AppError> {
    let new = validate_create(req)?;
    let now = OffsetDateTime::now_utc();
    let listing = Listing {
        id: Uuid::new_v4(),
        provider_id: provider.id,
        title: new.title,
        description: new.description,
        short_description: new.short_description,
        category: new.category,
        subcategory: new.subcategory,
        tags: new.tags,
        pricing: new.pricing,
        availability: new.availability,
        service_area: new.service_area,
        duration: new.duration,
        on_site: new.on_site,
        remote: new.remote,
        media: new.media,
        rating: Rating::default(),
        is_verified: false,
        verified_by: None,
        verified_at: None,
        status: ListingStatus::PendingReview,
        is_featured: false,
        featured_until: None,
        stats: Counters::default(),
        created_at: now,
        updated_at: now,
    };
    let saved = state.listings.insert(&listing).await?;
    info!(service_id = %saved.id, provider_id = %provider.id, "service created");
    Ok(saved)
}

fn filter_from_query(query: &ListQuery) -> Result<ListingFilter, AppError> {
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(Category::parse(raw).ok_or_else(|| {
            AppError::Validation(vec![FieldError::new(
                "category",
                format!("Invalid category {raw:?}"),
            )])
        })?),
    };
    Ok(ListingFilter {
        category,
        city: query
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from),
        min_price: query.min_price,
        max_price: query.max_price,
        min_rating: query.rating,
    })
}

pub async fn list(state: &AppState, query: ListQuery) -> Result<ListingPage, AppError> {
    let filter = filter_from_query(&query)?;
    let sort = SortKey::parse(query.sort.as_deref());
    let page = PageRequest::new(query.page, query.limit);
    let now = OffsetDateTime::now_utc();

    let featured = state
        .listings
        .find_featured(&filter, sort, now, page.limit)
        .await?;
    let regular = state.listings.find_regular(&filter, sort, now, page).await?;
    let total = state.listings.count_regular(&filter, now).await?;

    let services: Vec<Listing> = featured.into_iter().chain(regular).collect();

    let ids: Vec<Uuid> = services.iter().map(|l| l.id).collect();
    if !ids.is_empty() {
        let store = state.listings.clone();
        tokio::spawn(async move {
            if let Err(e) = store.increment_views(&ids).await {
                warn!(error = %e, count = ids.len(), "view count update failed");
            }
        });
    }

    Ok(ListingPage {
        services,
        pagination: Pagination::new(page, total),
    })
}

pub async fn get_by_id(state: &AppState, id: &str) -> Result<ListingDetails, AppError> {
    let id = parse_id(id)?;
    let mut listing = state
        .listings
        .find_by_id(id)
        .await?
        .filter(|l| l.status == ListingStatus::Active)
        .ok_or_else(not_found)?;

    state.listings.increment_views(&[id]).await?;
    listing.stats.views += 1;

    let mut wanted = vec![listing.provider_id];
    wanted.extend(listing.verified_by);
    let mut people: HashMap<Uuid, UserSummary> = state
        .users
        .find_summaries(&wanted)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let provider = people.get(&listing.provider_id).cloned();
    let verifier = listing.verified_by.and_then(|v| people.remove(&v));
    Ok(ListingDetails {
        listing,
        provider,
        verifier,
    })
}

fn apply_patch(listing: &mut Listing, patch: ListingPatch) {
    if patch.touches_reviewed_fields() {
        listing.status = ListingStatus::PendingReview;
    }
    if let Some(title) = patch.title {
        listing.title = title;
    }
    if let Some(description) = patch.description {
        listing.description = description;
    }
    if let Some(short) = patch.short_description {
        listing.short_description = Some(short).filter(|s| !s.is_empty());
    }
    if let Some(sub) = patch.subcategory {
        listing.subcategory = Some(sub).filter(|s| !s.is_empty());
    }
    if let Some(tags) = patch.tags {
        listing.tags = tags;
    }
    if let Some(duration) = patch.duration {
        listing.duration = Some(duration);
    }
    if let Some(availability) = patch.availability {
        listing.availability = availability;
    }
    if let Some(pricing) = patch.pricing {
        listing.pricing = pricing;
    }
    if let Some(area) = patch.service_area {
        listing.service_area = area;
    }
    if let Some(on_site) = patch.on_site {
        listing.on_site = on_site;
    }
    if let Some(remote) = patch.remote {
        listing.remote = remote;
    }
    if let Some(media) = patch.media {
        listing.media = media;
    }
}

pub async fn update(
    state: &AppState,
    user: &PublicUser,
    id: &str,
    req: UpdateListingRequest,
) -> Result<Listing, AppError> {
    let patch = validate_update(req)?;
    let mut listing = owned_listing(state, user, id).await?;

    let back_to_review = patch.touches_reviewed_fields();
    apply_patch(&mut listing, patch);
    listing.updated_at = OffsetDateTime::now_utc();

    let saved = state
        .listings
        .update(&listing)
        .await?
        .ok_or_else(not_found)?;
    info!(service_id = %saved.id, back_to_review, "service updated");
    Ok(saved)
}

pub async fn delete(state: &AppState, user: &PublicUser, id: &str) -> Result<(), AppError> {
    let listing = owned_listing(state, user, id).await?;
    if !state.listings.delete(listing.id).await? {
        return Err(not_found());
    }
    info!(service_id = %listing.id, "service deleted");
    Ok(())
}

pub async fn list_by_provider(state: &AppState, provider_id: &str) -> Result<Vec<Listing>, AppError> {
    let Ok(provider_id) = Uuid::parse_str(provider_id.trim()) else {
        return Ok(Vec::new());
    };
    Ok(state.listings.find_public_by_provider(provider_id).await?)
}

pub async fn rate(
    state: &AppState,
    customer: &PublicUser,
    id: &str,
    score: u8,
) -> Result<Rating, AppError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::Validation(vec![FieldError::new(
            "rating",
            format!("Rating must be between {MIN_SCORE} and {MAX_SCORE}"),
        )]));
    }
    let listing = state
        .listings
        .find_by_id(parse_id(id)?)
        .await?
        .filter(|l| l.status == ListingStatus::Active)
        .ok_or_else(not_found)?;
    if listing.provider_id == customer.id {
        return Err(AppError::Forbidden("You cannot rate your own service".into()));
    }

    let rating = state
        .listings
        .add_rating(listing.id, score as f64)
        .await?
        .ok_or_else(not_found)?;
    info!(service_id = %listing.id, user_id = %customer.id, score, "service rated");
    Ok(rating)
}

pub async fn moderate(
    state: &AppState,
    admin: &PublicUser,
    id: &str,
    req: ModerationRequest,
) -> Result<Listing, AppError> {
    let mut listing = state
        .listings
        .find_by_id(parse_id(id)?)
        .await?
        .ok_or_else(not_found)?;
    let now = OffsetDateTime::now_utc();

    if req.featured == Some(true) {
        match req.featured_until.or(listing.featured_until) {
            Some(until) if until > now => {}
            _ => {
                return Err(AppError::Validation(vec![FieldError::new(
                    "featuredUntil",
                    "Featured listings need an expiry in the future",
                )]))
            }
        }
    }

    if let Some(status) = req.status {
        listing.status = status;
    }
    if let Some(verified) = req.verified {
        listing.is_verified = verified;
        if verified {
            listing.verified_by = Some(admin.id);
            listing.verified_at = Some(now);
        } else {
            listing.verified_by = None;
            listing.verified_at = None;
        }
    }
    if let Some(featured) = req.featured {
        listing.is_featured = featured;
        if !featured {
            listing.featured_until = None;
        }
    }
    if let Some(until) = req.featured_until {
        if listing.is_featured {
            listing.featured_until = Some(until);
        }
    }
    listing.updated_at = now;

    let saved = state
        .listings
        .update(&listing)
        .await?
        .ok_or_else(not_found)?;
    info!(
        service_id = %saved.id,
        admin_id = %admin.id,
        status = saved.status.as_str(),
        verified = saved.is_verified,
        featured = saved.is_featured,
        "service moderated"
    );
    Ok(saved)
}
