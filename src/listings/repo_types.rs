use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Inactive,
    Suspended,
    PendingReview,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Inactive => "inactive",
            ListingStatus::Suspended => "suspended",
            ListingStatus::PendingReview => "pending_review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HomeCleaning,
    Plumbing,
    Electrical,
    Carpentry,
    Painting,
    ApplianceRepair,
    PestControl,
    BeautyWellness,
    Fitness,
    Tutoring,
    Photography,
    EventPlanning,
    MovingPacking,
    Gardening,
    Automotive,
    Other,
}

impl Category {
    /// Display order for the category list.
    pub const ALL: [Category; 16] = [
        Category::HomeCleaning,
        Category::Plumbing,
        Category::Electrical,
        Category::Carpentry,
        Category::Painting,
        Category::ApplianceRepair,
        Category::PestControl,
        Category::BeautyWellness,
        Category::Fitness,
        Category::Tutoring,
        Category::Photography,
        Category::EventPlanning,
        Category::MovingPacking,
        Category::Gardening,
        Category::Automotive,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::HomeCleaning => "home_cleaning",
            Category::Plumbing => "plumbing",
            Category::Electrical => "electrical",
            Category::Carpentry => "carpentry",
            Category::Painting => "painting",
            Category::ApplianceRepair => "appliance_repair",
            Category::PestControl => "pest_control",
            Category::BeautyWellness => "beauty_wellness",
            Category::Fitness => "fitness",
            Category::Tutoring => "tutoring",
            Category::Photography => "photography",
            Category::EventPlanning => "event_planning",
            Category::MovingPacking => "moving_packing",
            Category::Gardening => "gardening",
            Category::Automotive => "automotive",
            Category::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    Fixed,
    Hourly,
    PerVisit,
    Negotiable,
}

impl PricingType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "fixed" => Some(Self::Fixed),
            "hourly" => Some(Self::Hourly),
            "per_visit" => Some(Self::PerVisit),
            "negotiable" => Some(Self::Negotiable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFee {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    #[serde(rename = "type")]
    pub pricing_type: PricingType,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub additional_fees: Vec<AdditionalFee>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayAvailability {
    pub available: bool,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Availability {
    pub monday: DayAvailability,
    pub tuesday: DayAvailability,
    pub wednesday: DayAvailability,
    pub thursday: DayAvailability,
    pub friday: DayAvailability,
    pub saturday: DayAvailability,
    pub sunday: DayAvailability,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceArea {
    pub cities: Vec<String>,
    pub max_distance_km: Option<f64>,
    pub travel_fee: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    pub images: Vec<MediaRef>,
    pub videos: Vec<MediaRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: f64,
    pub count: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub views: i64,
    pub inquiries: i64,
    pub bookings: i64,
}

/// Row shape of the `services` table.
#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: Category,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub pricing: Json<Pricing>,
    pub availability: Json<Availability>,
    pub service_area: Json<ServiceArea>,
    pub duration: Option<Json<ServiceDuration>>,
    pub on_site: bool,
    pub remote: bool,
    pub media: Json<Media>,
    pub rating_average: f64,
    pub rating_count: i32,
    pub is_verified: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<OffsetDateTime>,
    pub status: ListingStatus,
    pub is_featured: bool,
    pub featured_until: Option<OffsetDateTime>,
    pub views: i64,
    pub inquiries: i64,
    pub bookings: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A service listing published by a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub provider_id: Uuid,
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
    pub rating: Rating,
    pub is_verified: bool,
    pub verified_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    pub status: ListingStatus,
    pub is_featured: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub featured_until: Option<OffsetDateTime>,
    pub stats: Counters,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ListingRow> for Listing {
    fn from(r: ListingRow) -> Self {
        Self {
            id: r.id,
            provider_id: r.provider_id,
            title: r.title,
            description: r.description,
            short_description: r.short_description,
            category: r.category,
            subcategory: r.subcategory,
            tags: r.tags,
            pricing: r.pricing.0,
            availability: r.availability.0,
            service_area: r.service_area.0,
            duration: r.duration.map(|d| d.0),
            on_site: r.on_site,
            remote: r.remote,
            media: r.media.0,
            rating: Rating {
                average: r.rating_average,
                count: r.rating_count,
            },
            is_verified: r.is_verified,
            verified_by: r.verified_by,
            verified_at: r.verified_at,
            status: r.status,
            is_featured: r.is_featured,
            featured_until: r.featured_until,
            stats: Counters {
                views: r.views,
                inquiries: r.inquiries,
                bookings: r.bookings,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Listing with provider and verifier resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetails {
    #[serde(flatten)]
    pub listing: Listing,
    pub provider: Option<UserSummary>,
    pub verifier: Option<UserSummary>,
}
