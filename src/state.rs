use std::sync::Arc;

use crate::{
    config::AppConfig,
    db,
    listings::repo::{ListingStore, PgListingStore},
    users::repo::{PgUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub listings: Arc<dyn ListingStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgListingStore::new(pool)),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        listings: Arc<dyn ListingStore>,
    ) -> Self {
        Self {
            config,
            users,
            listings,
        }
    }
}
