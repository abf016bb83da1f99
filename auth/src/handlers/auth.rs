use actix_web::{web, HttpResponse};
use authbridge_config::AppConfig;
use authbridge_models::{AuthResponseData, LoginRequest, RegisterRequest, User, VerifyRequest};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AuthError;
use crate::services::middleware::AuthenticatedUser;
use crate::services::{
    AccountService, MailingService, OAuth2Service, TokenService, UserStore, VerificationService,
};

fn account_service(pool: &web::Data<PgPool>, config: &web::Data<AppConfig>) -> AccountService {
    AccountService::new(
        UserStore::new(pool.get_ref().clone()),
        OAuth2Service::new(config.auth.oauth2.clone()),
    )
}

fn verification_service(
    pool: &web::Data<PgPool>,
    config: &web::Data<AppConfig>,
) -> VerificationService {
    VerificationService::new(
        UserStore::new(pool.get_ref().clone()),
        MailingService::new(config.mailing.clone()),
        config,
    )
}

fn auth_response_body(user: &User, config: &AppConfig) -> Result<AuthResponseData, AuthError> {
    let tokens = TokenService::new(&config.auth.user_token_secret);
    let public = user.public_data();
    let expiration_date = tokens.expiration_date();
    let token = tokens.issue(&public, expiration_date)?;
    Ok(AuthResponseData {
        user: public,
        expiration_date,
        token,
    })
}

/// The verification email rides after the response; a mailing failure must
/// not undo a registration that already committed.
fn send_registration_email_in_background(verification: VerificationService, user: User) {
    tokio::spawn(async move {
        if let Err(error) = verification.send_registration_email(&user).await {
            tracing::error!(user_id = %user.id, %error, "failed to send verification email");
        }
    });
}

pub async fn register(
    request: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AuthError> {
    let outcome = account_service(&pool, &config).register(&request).await?;
    let body = auth_response_body(&outcome.user, &config)?;

    if outcome.created {
        send_registration_email_in_background(
            verification_service(&pool, &config),
            outcome.user,
        );
    }

    Ok(HttpResponse::Created().json(json!({
        "data": body,
        "message": "User created successfully"
    })))
}

pub async fn login(
    request: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AuthError> {
    let user = account_service(&pool, &config).login(&request).await?;
    let body = auth_response_body(&user, &config)?;

    Ok(HttpResponse::Ok().json(json!({
        "data": body,
        "message": "Logged in successfully"
    })))
}

pub async fn verify(
    request: web::Json<VerifyRequest>,
    authenticated: AuthenticatedUser,
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AuthError> {
    authenticated.require_pending_verification()?;

    let user = verification_service(&pool, &config)
        .verify(authenticated.0.id, &request.verification_code)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "data": user.public_data(),
        "message": "User verified successfully"
    })))
}

pub async fn resend_verification_code(
    path: web::Path<Uuid>,
    authenticated: AuthenticatedUser,
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AuthError> {
    authenticated.require_pending_verification()?;

    let user_id = path.into_inner();
    if user_id != authenticated.0.id {
        return Err(AuthError::Unauthorized(
            "Cannot request a verification email for another user".to_string(),
        ));
    }

    verification_service(&pool, &config)
        .send_registration_email(&authenticated.0)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "data": authenticated.0.public_data(),
        "message": "Verification email resent successfully"
    })))
}

pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/verify", web::patch().to(verify))
            .route(
                "/resend-verification-code/{id}",
                web::get().to(resend_verification_code),
            ),
    );
}
