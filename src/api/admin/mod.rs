pub mod auth;
pub mod category;
pub mod product;

use axum::Router;

use auth::auth_router;
use category::admin_category_router;
use product::admin_product_router;

use crate::state::AppState;

/// Reads are open, every mutation goes through the auth middleware with the
/// roles its router asks for.
pub fn admin_api_router(state: &AppState) -> Router {
    Router::new()
        .merge(auth_router(state))
        .merge(admin_category_router(state))
        .merge(admin_product_router(state))
}
