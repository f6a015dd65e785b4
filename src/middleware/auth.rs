use crate::entities::admin::{self, Entity as AdminEntity, Role};
use crate::middleware::logging::{to_response, ApiError};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Checks the bearer token and lets the request through when the admin it
/// names still exists, is active and holds one of `state.roles`.
/// The admin record is put in the request extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let (claims, admin) = validate_token(&state.db, &state.secret, token, state.roles).await?;
    debug!(admin_id = claims.admin_id, role = claims.role.as_str(), "Authenticated admin");

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub admin_id: i32,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub secret: Arc<str>,
    pub roles: &'static [Role],
}

pub fn generate_token(admin: &admin::Model, secret: &str) -> Result<String, AuthError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::days(TOKEN_LIFETIME_DAYS))
        .ok_or(AuthError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        admin_id: admin.id,
        email: admin.email.clone(),
        role: admin.role,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::GenerationFail)
}

pub async fn validate_token(
    db: &DatabaseConnection,
    secret: &str,
    token: &str,
    roles: &[Role],
) -> Result<(Claims, admin::Model), AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthError::InvalidToken)?
    .claims;

    let admin = AdminEntity::find_by_id(claims.admin_id)
        .one(db)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if !admin.is_active {
        return Err(AuthError::Inactive);
    }
    //the stored role wins over the one baked into the token
    if !roles.contains(&admin.role) {
        return Err(AuthError::Forbidden);
    }

    Ok((claims, admin))
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Accès refusé. Token manquant.")]
    MissingToken,
    #[error("Token invalide")]
    InvalidToken,
    #[error("Compte désactivé")]
    Inactive,
    #[error("Accès non autorisé")]
    Forbidden,
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::Inactive
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::GenerationFail | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (message, ext) = match &self {
            AuthError::GenerationFail => (
                "Erreur serveur".to_string(),
                ApiError::TokenGenerationFailed(self.to_string()),
            ),
            AuthError::Database(err) => ("Erreur serveur".to_string(), ApiError::DbError(err.to_string())),
            other => (other.to_string(), ApiError::Auth(other.to_string())),
        };

        to_response(
            (
                self.status(),
                Json(json!({
                    "success": false,
                    "error": message
                })),
            ),
            Err(ext),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_admin() -> admin::Model {
        admin::Model {
            id: 7,
            email: "gerant@rita-aloe.com".to_string(),
            name: "Gérant".to_string(),
            password: String::new(),
            role: Role::Admin,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_carries_admin_identity() {
        let token = generate_token(&sample_admin(), "secret").unwrap();
        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap()
        .claims;

        assert_eq!(claims.admin_id, 7);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.email, "gerant@rita-aloe.com");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = generate_token(&sample_admin(), "secret").unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn statuses() {
        assert_eq!(AuthError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::GenerationFail.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
