pub mod api;
pub mod cart;
pub mod config;
pub mod entities;
pub mod error;
pub mod images;
pub mod middleware;
pub mod state;
pub mod store;

use axum::Router;
use sea_orm::{Database, DbErr};
use std::sync::Arc;
use tracing::info;

use crate::api::create_api_router;
use crate::config::Config;
use crate::entities::{seed_admin, setup_schema};
use crate::images::LocalImageStore;
use crate::state::AppState;

/// Connects to the database, prepares the schema and seed account, and
/// returns the full application router.
pub async fn build_app(config: Config) -> Result<Router, DbErr> {
    let db = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;
    seed_admin(&db, &config.admin).await?;

    let images = LocalImageStore::new(&config.upload_dir, config.file_size_limit);
    info!(dir = %images.root().display(), "Serving uploads");

    let state = AppState::new(db, Arc::new(images), config);
    Ok(create_api_router(state))
}
