pub mod admin;
pub mod forms;
pub mod public;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::StoreError;
use crate::middleware::logging::{logging_middleware, to_response, ApiError};
use crate::state::AppState;
use crate::store::{category::ParentFilter, Page};

use admin::admin_api_router;
use public::{public_api_router, uploads::uploads_router};

/// Headroom on top of the image limit for the text parts of a form.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn create_api_router(state: AppState) -> Router {
    let body_limit = state.config.file_size_limit + FORM_OVERHEAD;

    Router::new()
        .nest("/api", public_api_router())
        .nest("/api/admin", admin_api_router(&state))
        .nest("/uploads", uploads_router())
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(state))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

/// `{ success: true, data, message? }`
pub fn success<T: Serialize>(status: StatusCode, data: T, message: Option<&str>) -> Response {
    let body = match message {
        Some(message) => json!({ "success": true, "data": data, "message": message }),
        None => json!({ "success": true, "data": data }),
    };
    to_response((status, Json(body)), Ok(()))
}

pub fn message(status: StatusCode, message: &str) -> Response {
    to_response(
        (status, Json(json!({ "success": true, "message": message }))),
        Ok(()),
    )
}

/// `{ success: true, data, pagination }`
pub fn paginated<T: Serialize>(page: Page<T>) -> Response {
    to_response(
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": page.items,
                "pagination": page.pagination,
            })),
        ),
        Ok(()),
    )
}

/// `null` selects top-level categories, a number selects that parent's children.
pub fn parent_filter(raw: Option<&str>) -> Result<Option<ParentFilter>, StoreError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some("null") => Ok(Some(ParentFilter::TopLevel)),
        Some(id) => id
            .parse()
            .map(|id| Some(ParentFilter::Parent(id)))
            .map_err(|_| StoreError::Validation("Paramètre parent_id invalide".to_string())),
    }
}

pub async fn fallback() -> impl IntoResponse {
    to_response(
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Route non trouvée" })),
        ),
        Err(ApiError::NotFound("unknown route".to_string())),
    )
}
