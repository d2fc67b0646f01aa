//! Field rules for listing payloads. Every violated field is reported at once.

use super::{
    dto::{CreateListingRequest, PricingInput, UpdateListingRequest},
    repo_types::{Availability, Category, Media, Pricing, PricingType, ServiceArea, ServiceDuration},
};
use crate::error::{AppError, FieldError};

const TITLE_LEN: std::ops::RangeInclusive<usize> = 5..=100;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 20..=1000;
const SHORT_DESCRIPTION_MAX: usize = 200;
const MAX_TAGS: usize = 10;
const DEFAULT_CURRENCY: &str = "INR";

/// A create payload that passed validation.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: Category,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub pricing: Pricing,
    pub availability: Availability,
    pub service_area: ServiceArea,
    pub duration: Option<ServiceDuration>,
    pub on_site: bool,
    pub remote: bool,
    pub media: Media,
}

/// An update payload that passed validation; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub duration: Option<ServiceDuration>,
    pub availability: Option<Availability>,
    pub pricing: Option<Pricing>,
    pub service_area: Option<ServiceArea>,
    pub on_site: Option<bool>,
    pub remote: Option<bool>,
    pub media: Option<Media>,
}

impl ListingPatch {
    /// Edits to these fields send the listing back to moderation.
    pub fn touches_reviewed_fields(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.pricing.is_some()
    }
}

#[derive(Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}

fn text_in_range(
    v: &mut Violations,
    field: &str,
    label: &str,
    raw: &str,
    range: std::ops::RangeInclusive<usize>,
) -> String {
    let trimmed = raw.trim().to_string();
    if !range.contains(&trimmed.chars().count()) {
        v.push(
            field,
            format!("{label} must be between {} and {} characters", range.start(), range.end()),
        );
    }
    trimmed
}

fn short_description(v: &mut Violations, raw: String) -> Option<String> {
    let trimmed = raw.trim().to_string();
    if trimmed.chars().count() > SHORT_DESCRIPTION_MAX {
        v.push(
            "shortDescription",
            format!("Short description cannot exceed {SHORT_DESCRIPTION_MAX} characters"),
        );
    }
    Some(trimmed).filter(|s| !s.is_empty())
}

fn tags(v: &mut Violations, raw: Vec<String>) -> Vec<String> {
    let tags: Vec<String> = raw
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > MAX_TAGS {
        v.push("tags", format!("At most {MAX_TAGS} tags are allowed"));
    }
    tags
}

fn pricing(v: &mut Violations, raw: Option<PricingInput>) -> Option<Pricing> {
    let Some(raw) = raw else {
        v.push("pricing", "Pricing is required");
        return None;
    };

    let pricing_type = match raw.pricing_type.as_deref().map(str::trim) {
        None | Some("") => {
            v.push("pricing.type", "Pricing type is required");
            None
        }
        Some(t) => {
            let parsed = PricingType::parse(t);
            if parsed.is_none() {
                v.push("pricing.type", "Pricing type must be fixed, hourly, per_visit or negotiable");
            }
            parsed
        }
    };

    let amount = match raw.amount {
        None => {
            v.push("pricing.amount", "Price amount is required");
            None
        }
        Some(a) if !a.is_finite() || a < 0.0 => {
            v.push("pricing.amount", "Price amount cannot be negative");
            None
        }
        Some(a) => Some(a),
    };

    if raw
        .additional_fees
        .iter()
        .any(|f| !f.amount.is_finite() || f.amount < 0.0 || f.name.trim().is_empty())
    {
        v.push(
            "pricing.additionalFees",
            "Additional fees need a name and a non-negative amount",
        );
    }

    let currency = raw
        .currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.into());

    Some(Pricing {
        pricing_type: pricing_type?,
        amount: amount?,
        currency,
        additional_fees: raw.additional_fees,
    })
}

fn service_area(v: &mut Violations, raw: Option<ServiceArea>) -> ServiceArea {
    let mut area = raw.unwrap_or_default();
    area.cities = area
        .cities
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if area.cities.is_empty() {
        v.push("serviceArea.cities", "At least one city is required");
    }
    if area.max_distance_km.is_some_and(|d| !d.is_finite() || d < 0.0) {
        v.push("serviceArea.maxDistanceKm", "Maximum distance cannot be negative");
    }
    if area.travel_fee.is_some_and(|f| !f.is_finite() || f < 0.0) {
        v.push("serviceArea.travelFee", "Travel fee cannot be negative");
    }
    area
}

fn duration(v: &mut Violations, raw: Option<ServiceDuration>) -> Option<ServiceDuration> {
    if raw.as_ref().is_some_and(|d| d.value == 0) {
        v.push("duration.value", "Duration must be positive");
    }
    raw
}

pub fn validate_create(req: CreateListingRequest) -> Result<NewListing, AppError> {
    let mut v = Violations::default();

    let title = match req.title {
        Some(t) => text_in_range(&mut v, "title", "Title", &t, TITLE_LEN),
        None => {
            v.push("title", "Title is required");
            String::new()
        }
    };
    let description = match req.description {
        Some(d) => text_in_range(&mut v, "description", "Description", &d, DESCRIPTION_LEN),
        None => {
            v.push("description", "Description is required");
            String::new()
        }
    };
    let short_description = req.short_description.and_then(|s| short_description(&mut v, s));

    let category = match req.category.as_deref().map(str::trim) {
        None | Some("") => {
            v.push("category", "Category is required");
            None
        }
        Some(raw) => {
            let parsed = Category::parse(raw);
            if parsed.is_none() {
                v.push("category", format!("Invalid category {raw:?}"));
            }
            parsed
        }
    };

    let tags = tags(&mut v, req.tags.unwrap_or_default());
    let pricing = pricing(&mut v, req.pricing);
    let service_area = service_area(&mut v, req.service_area);
    let duration = duration(&mut v, req.duration);

    let (Some(category), Some(pricing)) = (category, pricing) else {
        return Err(AppError::Validation(v.0));
    };

    v.finish(NewListing {
        title,
        description,
        short_description,
        category,
        subcategory: req
            .subcategory
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        tags,
        pricing,
        availability: req.availability.unwrap_or_default(),
        service_area,
        duration,
        on_site: req.on_site.unwrap_or(true),
        remote: req.remote.unwrap_or(false),
        media: req.media.unwrap_or_default(),
    })
}

/// Same rules as create, applied only to the fields present.
pub fn validate_update(req: UpdateListingRequest) -> Result<ListingPatch, AppError> {
    let mut v = Violations::default();

    let title = req
        .title
        .map(|t| text_in_range(&mut v, "title", "Title", &t, TITLE_LEN));
    let description = req
        .description
        .map(|d| text_in_range(&mut v, "description", "Description", &d, DESCRIPTION_LEN));
    let short_description = req.short_description.map(|s| {
        short_description(&mut v, s).unwrap_or_default()
    });
    let tags = req.tags.map(|t| tags(&mut v, t));
    let pricing = match req.pricing {
        Some(p) => pricing(&mut v, Some(p)),
        None => None,
    };
    let service_area = req.service_area.map(|a| service_area(&mut v, Some(a)));
    let duration = duration(&mut v, req.duration);

    v.finish(ListingPatch {
        title,
        description,
        short_description,
        subcategory: req.subcategory.map(|s| s.trim().to_string()),
        tags,
        duration,
        availability: req.availability,
        pricing,
        service_area,
        on_site: req.on_site,
        remote: req.remote,
        media: req.media,
    })
}
