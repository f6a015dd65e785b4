pub mod category;
pub mod product;
pub mod uploads;

use axum::Router;

use category::category_router;
use product::product_router;

pub fn public_api_router() -> Router {
    Router::new()
        .merge(category_router())
        .merge(product_router())
}
