use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::entities::admin::Role;
use crate::images::ImageStore;
use crate::middleware::auth::AuthState;
use crate::store::{category::CategoryStore, product::ProductStore};

/// Shared handles passed to every router through an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub images: Arc<dyn ImageStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, images: Arc<dyn ImageStore>, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            images,
            config: Arc::new(config),
        }
    }

    pub fn categories(&self) -> CategoryStore {
        CategoryStore::new(self.db.clone(), self.images.clone())
    }

    pub fn products(&self) -> ProductStore {
        ProductStore::new(self.db.clone(), self.images.clone())
    }

    pub fn auth(&self, roles: &'static [Role]) -> AuthState {
        AuthState {
            db: self.db.clone(),
            secret: Arc::from(self.config.jwt_secret.as_str()),
            roles,
        }
    }
}
