use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use authbridge_config::AppConfig;
use authbridge_models::{User, UserStatus};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::error::AuthError;
use crate::services::{TokenService, UserStore};

/// Extractor that resolves the bearer token on a request into the live user
/// it was issued to. Handlers take this as an argument to require auth.
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// Gate for verification-related routes.
    pub fn require_pending_verification(&self) -> Result<(), AuthError> {
        if self.0.status != UserStatus::PendingVerification {
            return Err(AuthError::Unauthorized(
                "User status is not pending verification".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let config = req
                .app_data::<web::Data<AppConfig>>()
                .ok_or_else(|| AuthError::internal("app config is not registered"))?;
            let pool = req
                .app_data::<web::Data<PgPool>>()
                .ok_or_else(|| AuthError::internal("database pool is not registered"))?;

            let token = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim_start_matches("Bearer ").to_string())
                .filter(|token| !token.is_empty())
                .ok_or_else(|| {
                    AuthError::Unauthorized("No token found in headers".to_string())
                })?;

            let claims = TokenService::new(&config.auth.user_token_secret)
                .decode(&token)
                .ok_or_else(|| AuthError::Unauthorized("Invalid token value".to_string()))?;

            if claims.is_expired(Utc::now()) {
                return Err(AuthError::Unauthorized("Token is expired".to_string()));
            }

            let user = UserStore::new(pool.get_ref().clone())
                .find_by_id(claims.id)
                .await?
                .ok_or_else(|| AuthError::UserInput("User not found".to_string()))?;

            Ok(AuthenticatedUser(user))
        })
    }
}
