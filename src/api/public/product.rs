use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::{paginated, success};
use crate::error::StoreError;
use crate::state::AppState;
use crate::store::product::ProductFilter;
use crate::store::PageRequest;

pub fn product_router() -> Router {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/:slug", get(get_product))
}

#[derive(Debug, Deserialize)]
struct GetProductsQuery {
    category: Option<String>,
    search: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn get_products(
    Query(params): Query<GetProductsQuery>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let filter = ProductFilter {
        category: params.category,
        search: params.search,
        in_stock: Some(true),
    };

    let page = state
        .products()
        .list(&filter, PageRequest::new(params.page, params.limit))
        .await?;
    Ok(paginated(page))
}

async fn get_product(
    Path(slug): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let product = state.products().get_by_slug(&slug).await?;
    Ok(success(StatusCode::OK, product, None))
}
