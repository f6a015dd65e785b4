use axum::{
    extract::Extension,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::api::success;
use crate::entities::admin::{self, Entity as AdminEntity, Role};
use crate::error::StoreError;
use crate::middleware::auth::{auth_middleware, generate_token, AuthError};
use crate::state::AppState;

pub fn auth_router(state: &AppState) -> Router {
    Router::new()
        .route(
            "/auth/me",
            get(me).route_layer(from_fn_with_state(state.auth(Role::ALL), auth_middleware)),
        )
        .route("/auth/login", post(login))
}

#[derive(Clone, Debug, Deserialize, Validate)]
struct LoginPayload {
    #[validate(email(message = "Email invalide"))]
    email: String,
    #[validate(length(min = 1, message = "Le mot de passe est requis"))]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl AdminResponse {
    pub fn new(model: admin::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            role: model.role,
            is_active: model.is_active,
            last_login: model.last_login,
        }
    }
}

async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, LoginError> {
    payload.validate().map_err(StoreError::from)?;

    let email = payload.email.trim().to_lowercase();
    let admin = AdminEntity::find()
        .filter(admin::Column::Email.eq(email.as_str()))
        .one(&*state.db)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !admin.is_active {
        return Err(AuthError::Inactive.into());
    }
    if let Err(reason) = admin.check_hash(&payload.password) {
        warn!(email = %email, reason = %reason, "Rejected admin login");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = generate_token(&admin, &state.config.jwt_secret)?;

    let mut logged_in: admin::ActiveModel = admin.into();
    logged_in.last_login = Set(Some(Utc::now()));
    let admin = logged_in.update(&*state.db).await.map_err(AuthError::from)?;

    info!(admin_id = admin.id, role = admin.role.as_str(), "Admin logged in");
    Ok(success(
        StatusCode::OK,
        json!({
            "token": token,
            "admin": AdminResponse::new(admin),
        }),
        Some("Connexion réussie"),
    ))
}

async fn me(Extension(admin): Extension<admin::Model>) -> Response {
    success(StatusCode::OK, AdminResponse::new(admin), None)
}

/// Login fails either on its payload or on the credentials.
enum LoginError {
    Payload(StoreError),
    Auth(AuthError),
}

impl From<StoreError> for LoginError {
    fn from(err: StoreError) -> Self {
        LoginError::Payload(err)
    }
}

impl From<AuthError> for LoginError {
    fn from(err: AuthError) -> Self {
        LoginError::Auth(err)
    }
}

impl axum::response::IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match self {
            LoginError::Payload(err) => err.into_response(),
            LoginError::Auth(err) => err.into_response(),
        }
    }
}
