use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};

use super::{
    query::Pagination,
    repo_types::{
        AdditionalFee, Availability, Listing, ListingDetails, ListingStatus, Media, Rating,
        ServiceArea, ServiceDuration,
    },
};

/// Raw pricing block; enum-valued fields stay strings so bad values surface as
/// field errors rather than body rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInput {
    #[serde(rename = "type")]
    pub pricing_type: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub additional_fees: Vec<AdditionalFee>,
}

/// Body of `POST /services`. There is no status field: new listings always await review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pricing: Option<PricingInput>,
    pub availability: Option<Availability>,
    pub service_area: Option<ServiceArea>,
    pub duration: Option<ServiceDuration>,
    pub on_site: Option<bool>,
    pub remote: Option<bool>,
    pub media: Option<Media>,
}

/// Body of `PUT /services/:id`. Only these fields may be changed by the owner;
/// anything else in the payload is dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub duration: Option<ServiceDuration>,
    pub availability: Option<Availability>,
    pub pricing: Option<PricingInput>,
    pub service_area: Option<ServiceArea>,
    pub on_site: Option<bool>,
    pub remote: Option<bool>,
    pub media: Option<Media>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// Filter forms submit untouched inputs as `key=`; treat those as absent.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: u8,
}

/// Admin moderation of a listing's visibility.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub status: Option<ListingStatus>,
    pub verified: Option<bool>,
    pub featured: Option<bool>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub featured_until: Option<time::OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct ServiceEnvelope {
    pub service: Listing,
}

#[derive(Debug, Serialize)]
pub struct ServiceDetailsEnvelope {
    pub service: ListingDetails,
}

#[derive(Debug, Serialize)]
pub struct ServicesEnvelope {
    pub services: Vec<Listing>,
}

#[derive(Debug, Serialize)]
pub struct ListingPage {
    pub services: Vec<Listing>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct RatingEnvelope {
    pub rating: Rating,
}
