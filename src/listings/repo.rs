use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    query::{like_pattern, ListingFilter, PageRequest, SortKey},
    repo_types::{Listing, ListingRow, ListingStatus, Rating},
};

const LISTING_COLUMNS: &str = r#"
    id, provider_id, title, description, short_description, category, subcategory, tags,
    pricing, availability, service_area, duration, on_site, remote, media,
    rating_average, rating_count, is_verified, verified_by, verified_at, status,
    is_featured, featured_until, views, inquiries, bookings, created_at, updated_at
"#;

/// Listing persistence. Every write touches a single document.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert(&self, listing: &Listing) -> anyhow::Result<Listing>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>>;
    /// Replaces every mutable field; rating and counters are left alone.
    async fn update(&self, listing: &Listing) -> anyhow::Result<Option<Listing>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Public, currently featured matches ordered by expiry first.
    async fn find_featured(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        now: OffsetDateTime,
        limit: u32,
    ) -> anyhow::Result<Vec<Listing>>;
    /// One page of public matches that are not currently featured.
    async fn find_regular(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        now: OffsetDateTime,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Listing>>;
    async fn count_regular(&self, filter: &ListingFilter, now: OffsetDateTime) -> anyhow::Result<u64>;
    /// Public listings of one provider, featured first then newest.
    async fn find_public_by_provider(&self, provider_id: Uuid) -> anyhow::Result<Vec<Listing>>;
    async fn increment_views(&self, ids: &[Uuid]) -> anyhow::Result<()>;
    /// Folds one score into the running mean; `None` if the listing is gone.
    async fn add_rating(&self, id: Uuid, score: f64) -> anyhow::Result<Option<Rating>>;
}

#[derive(Clone)]
pub struct PgListingStore {
    db: PgPool,
}

impl PgListingStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_public_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ListingFilter) {
    qb.push(" WHERE status = ")
        .push_bind(ListingStatus::Active)
        .push(" AND is_verified = TRUE");

    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(city) = &filter.city {
        qb.push(
            " AND EXISTS (SELECT 1 FROM jsonb_array_elements_text(service_area->'cities') AS c(city) \
             WHERE c.city ILIKE ",
        )
        .push_bind(like_pattern(city))
        .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND (pricing->>'amount')::float8 >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND (pricing->>'amount')::float8 <= ").push_bind(max);
    }
    if let Some(rating) = filter.min_rating {
        qb.push(" AND rating_average >= ").push_bind(rating);
    }
}

fn push_featured(qb: &mut QueryBuilder<'_, Postgres>, now: OffsetDateTime, featured: bool) {
    if featured {
        qb.push(" AND is_featured = TRUE AND featured_until > ").push_bind(now);
    } else {
        qb.push(" AND NOT (is_featured AND COALESCE(featured_until > ")
            .push_bind(now)
            .push(", FALSE))");
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn insert(&self, l: &Listing) -> anyhow::Result<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            INSERT INTO services (
                id, provider_id, title, description, short_description, category, subcategory,
                tags, pricing, availability, service_area, duration, on_site, remote, media,
                rating_average, rating_count, is_verified, status, is_featured, featured_until,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $22)
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(l.id)
        .bind(l.provider_id)
        .bind(&l.title)
        .bind(&l.description)
        .bind(&l.short_description)
        .bind(l.category)
        .bind(&l.subcategory)
        .bind(&l.tags)
        .bind(Json(&l.pricing))
        .bind(Json(&l.availability))
        .bind(Json(&l.service_area))
        .bind(l.duration.as_ref().map(Json))
        .bind(l.on_site)
        .bind(l.remote)
        .bind(Json(&l.media))
        .bind(l.rating.average)
        .bind(l.rating.count)
        .bind(l.is_verified)
        .bind(l.status)
        .bind(l.is_featured)
        .bind(l.featured_until)
        .bind(l.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert service")?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find service by id")?;
        Ok(row.map(Listing::from))
    }

    async fn update(&self, l: &Listing) -> anyhow::Result<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE services
               SET title = $2, description = $3, short_description = $4, subcategory = $5,
                   tags = $6, pricing = $7, availability = $8, service_area = $9, duration = $10,
                   on_site = $11, remote = $12, media = $13, is_verified = $14, verified_by = $15,
                   verified_at = $16, status = $17, is_featured = $18, featured_until = $19,
                   updated_at = $20
             WHERE id = $1
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(l.id)
        .bind(&l.title)
        .bind(&l.description)
        .bind(&l.short_description)
        .bind(&l.subcategory)
        .bind(&l.tags)
        .bind(Json(&l.pricing))
        .bind(Json(&l.availability))
        .bind(Json(&l.service_area))
        .bind(l.duration.as_ref().map(Json))
        .bind(l.on_site)
        .bind(l.remote)
        .bind(Json(&l.media))
        .bind(l.is_verified)
        .bind(l.verified_by)
        .bind(l.verified_at)
        .bind(l.status)
        .bind(l.is_featured)
        .bind(l.featured_until)
        .bind(l.updated_at)
        .fetch_optional(&self.db)
        .await
        .context("update service")?;
        Ok(row.map(Listing::from))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete service")?;
        Ok(res.rows_affected() > 0)
    }

    async fn find_featured(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        now: OffsetDateTime,
        limit: u32,
    ) -> anyhow::Result<Vec<Listing>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {LISTING_COLUMNS} FROM services"));
        push_public_filter(&mut qb, filter);
        push_featured(&mut qb, now, true);
        qb.push(" ORDER BY featured_until DESC, ")
            .push(sort.order_by())
            .push(" LIMIT ")
            .push_bind(limit as i64);
        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(&self.db)
            .await
            .context("find featured services")?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn find_regular(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        now: OffsetDateTime,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Listing>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {LISTING_COLUMNS} FROM services"));
        push_public_filter(&mut qb, filter);
        push_featured(&mut qb, now, false);
        qb.push(" ORDER BY ")
            .push(sort.order_by())
            .push(", id LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(&self.db)
            .await
            .context("find services page")?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn count_regular(&self, filter: &ListingFilter, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM services");
        push_public_filter(&mut qb, filter);
        push_featured(&mut qb, now, false);
        let total: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .context("count services")?;
        Ok(total.max(0) as u64)
    }

    async fn find_public_by_provider(&self, provider_id: Uuid) -> anyhow::Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
              FROM services
             WHERE provider_id = $1 AND status = $2 AND is_verified = TRUE
             ORDER BY is_featured DESC, created_at DESC
            "#
        ))
        .bind(provider_id)
        .bind(ListingStatus::Active)
        .fetch_all(&self.db)
        .await
        .context("find services by provider")?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn increment_views(&self, ids: &[Uuid]) -> anyhow::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE services SET views = views + 1 WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.db)
            .await
            .context("increment service views")?;
        Ok(())
    }

    async fn add_rating(&self, id: Uuid, score: f64) -> anyhow::Result<Option<Rating>> {
        let row: Option<(f64, i32)> = sqlx::query_as(
            r#"
            UPDATE services
               SET rating_average = (rating_average * rating_count + $2) / (rating_count + 1),
                   rating_count = rating_count + 1
             WHERE id = $1
            RETURNING rating_average, rating_count
            "#,
        )
        .bind(id)
        .bind(score)
        .fetch_optional(&self.db)
        .await
        .context("add service rating")?;
        Ok(row.map(|(average, count)| Rating { average, count }))
    }
}
