use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::{paginated, parent_filter, success};
use crate::error::StoreError;
use crate::state::AppState;
use crate::store::category::{CategoryFilter, StatusFilter};
use crate::store::PageRequest;

pub fn category_router() -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/tree", get(get_category_tree))
        .route("/categories/:id", get(get_category))
}

#[derive(Debug, Deserialize)]
struct GetCategoriesQuery {
    search: Option<String>,
    parent_id: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn get_categories(
    Query(params): Query<GetCategoriesQuery>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let filter = CategoryFilter {
        search: params.search,
        status: Some(StatusFilter::Active),
        parent: parent_filter(params.parent_id.as_deref())?,
    };

    let page = state
        .categories()
        .list(&filter, PageRequest::new(params.page, params.limit))
        .await?;
    Ok(paginated(page))
}

async fn get_category_tree(Extension(state): Extension<AppState>) -> Result<Response, StoreError> {
    let tree = state.categories().tree(true).await?;
    Ok(success(StatusCode::OK, tree, None))
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let detail = state.categories().get(id).await?;
    if !detail.view.category.is_active {
        return Err(StoreError::NotFound("Catégorie non trouvée".to_string()));
    }
    Ok(success(StatusCode::OK, detail, None))
}
