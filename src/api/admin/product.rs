use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::forms::MultipartForm;
use crate::api::{message, paginated, success};
use crate::entities::admin::Role;
use crate::error::StoreError;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;
use crate::store::product::{ProductFilter, ProductPatch};
use crate::store::PageRequest;

pub fn admin_product_router(state: &AppState) -> Router {
    let writes = Router::new()
        .route("/products", post(create_product))
        .route(
            "/products/:id",
            patch(update_product).delete(delete_product),
        )
        .route_layer(from_fn_with_state(
            state.auth(Role::MANAGERS),
            auth_middleware,
        ));

    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .merge(writes)
}

#[derive(Debug, Deserialize)]
struct ListProductsQuery {
    category: Option<String>,
    search: Option<String>,
    status: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

async fn list_products(
    Query(params): Query<ListProductsQuery>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let in_stock = match params.status.as_deref() {
        Some("in-stock") => Some(true),
        Some("out-of-stock") => Some(false),
        _ => None,
    };
    let filter = ProductFilter {
        category: params.category,
        search: params.search,
        in_stock,
    };

    let page = state
        .products()
        .list(&filter, PageRequest::new(params.page, params.limit))
        .await?;
    Ok(paginated(page))
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    let product = state.products().get(id).await?;
    Ok(success(StatusCode::OK, product, None))
}

async fn create_product(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Result<Response, StoreError> {
    let mut form = MultipartForm::read(&mut multipart).await?;
    let input = form.product_input()?;
    let image = form.take_image();

    let created = state.products().create(input, image).await?;
    Ok(success(
        StatusCode::CREATED,
        created,
        Some("Produit créé avec succès"),
    ))
}

async fn update_product(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
    Json(patch): Json<ProductPatch>,
) -> Result<Response, StoreError> {
    let updated = state.products().update(id, patch).await?;
    Ok(success(
        StatusCode::OK,
        updated,
        Some("Produit mis à jour avec succès"),
    ))
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, StoreError> {
    state.products().delete(id).await?;
    Ok(message(StatusCode::OK, "Produit supprimé avec succès"))
}
