use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::images::resolve_upload_path;
use crate::middleware::logging::{to_response, ApiError};
use crate::state::AppState;

pub fn uploads_router() -> Router {
    Router::new().route("/*path", get(serve_upload))
}

/// Streams a stored image back with a content type guessed from its extension.
pub async fn serve_upload(
    Path(path): Path<String>,
    Extension(state): Extension<AppState>,
) -> Response {
    let Some(full_path) = resolve_upload_path(&state.config.upload_dir, &path) else {
        return not_found(format!("Rejected upload path {path}"));
    };

    let file = match tokio::fs::File::open(&full_path).await {
        Ok(file) => file,
        Err(err) => return not_found(format!("{}: {err}", full_path.display())),
    };

    let content_type = mime_guess::from_path(&full_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let stream = ReaderStream::new(file);
    let body = axum::body::Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    to_response((headers, body), Ok(()))
}

fn not_found(reason: String) -> Response {
    to_response(
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": "Fichier non trouvé"
            })),
        ),
        Err(ApiError::NotFound(reason)),
    )
}
