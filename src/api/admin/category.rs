use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::forms::MultipartForm;
use crate::api::{message, paginated, parent_filter, success};
use crate::entities::admin::Role;
use crate::error::StoreError;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;
use crate::store::category::{CategoryFilter, StatusFilter};
use crate::store::PageRequest;

pub fn admin_category_router(state: &AppState) -> Router {
    let writes = Router::new()
        .route("/categories", post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route_layer(from_fn_with_state(state.auth(Role::ALL), auth_middleware));

    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/tree", get(category_tree))
        .route("/categories/:id", get(get_category))
        .merge(writes)
}

#[derive(Debug, Deserialize)]
struct ListCategoriesQuery {
    search: Option<String>,
    status: Option<String>,
    parent_id: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn list_categories(
    Query(params): Query<ListCategoriesQuery>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let status = match params.status.as_deref() {
        Some("active") => Some(StatusFilter::Active),
        Some("inactive") => Some(StatusFilter::Inactive),
        _ => None,
    };
    let filter = CategoryFilter {
        search: params.search,
        status,
        parent: parent_filter(params.parent_id.as_deref())?,
    };

    let page = state
        .categories()
        .list(&filter, PageRequest::new(params.page, params.limit))
        .await?;
    Ok(paginated(page))
}

async fn category_tree(Extension(state): Extension<AppState>) -> Result<Response, StoreError> {
    let tree = state.categories().tree(false).await?;
    Ok(success(StatusCode::OK, tree, None))
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let detail = state.categories().get(id).await?;
    Ok(success(StatusCode::OK, detail, None))
}

async fn create_category(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Result<Response, StoreError> {
    let mut form = MultipartForm::read(&mut multipart).await?;
    let input = form.category_input()?;
    let image = form.take_image();

    let created = state.categories().create(input, image).await?;
    Ok(success(
        StatusCode::CREATED,
        created,
        Some("Catégorie créée avec succès"),
    ))
}

async fn update_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Result<Response, StoreError> {
    let mut form = MultipartForm::read(&mut multipart).await?;
    let input = form.category_input()?;
    let image = form.image_change();

    let updated = state.categories().update(id, input, image).await?;
    Ok(success(
        StatusCode::OK,
        updated,
        Some("Catégorie mise à jour avec succès"),
    ))
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    state.categories().delete(id).await?;
    Ok(message(StatusCode::OK, "Catégorie supprimée avec succès"))
}
