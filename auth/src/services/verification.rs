use authbridge_config::{AppConfig, EmailIdentity};
use authbridge_models::{User, UserStatus, VERIFICATION_CODE_LENGTH};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::emails;
use crate::error::AuthError;
use crate::services::{MailingService, UserStore};

/// Opaque single-account verification code, generated once at registration.
pub fn generate_verification_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Account verification: checks mailed-out codes and sends the emails that
/// carry them.
#[derive(Clone)]
pub struct VerificationService {
    store: UserStore,
    mailing: MailingService,
    frontend_domain: String,
    verify_user_url_path: String,
    app_name: String,
}

impl VerificationService {
    pub fn new(store: UserStore, mailing: MailingService, config: &AppConfig) -> Self {
        VerificationService {
            store,
            mailing,
            frontend_domain: config.auth.frontend_domain.clone(),
            verify_user_url_path: config.auth.verify_user_url_path.clone(),
            app_name: config.app.name.clone(),
        }
    }

    /// Activates the account when the code matches. Re-verifying an already
    /// active account with the right code stays a success and changes
    /// nothing.
    pub async fn verify(&self, user_id: Uuid, verification_code: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::UserInput("User not found".to_string()))?;

        if user.verification_code != verification_code {
            return Err(AuthError::AuthFailed(
                "Verification code is invalid".to_string(),
            ));
        }

        if user.status == UserStatus::Active {
            return Ok(user);
        }

        self.store.set_status(user.id, UserStatus::Active).await?;
        tracing::info!(user_id = %user.id, "verified user account");

        self.store
            .find_by_id(user.id)
            .await?
            .ok_or_else(|| AuthError::internal("verified user row is missing"))
    }

    /// Emails the verification link to the user. Accounts created through a
    /// provider that never yielded an email address cannot be mailed.
    pub async fn send_registration_email(&self, user: &User) -> Result<(), AuthError> {
        let email = user
            .email
            .as_ref()
            .ok_or_else(|| AuthError::internal("user has no email address to verify"))?;

        let verification_url = format!(
            "{}{}?id={}&verificationCode={}",
            self.frontend_domain, self.verify_user_url_path, user.id, user.verification_code
        );

        let to = EmailIdentity {
            name: format!("{} {}", user.first_name, user.last_name),
            email: email.clone(),
        };
        let html = emails::registration_html(&user.first_name, &self.app_name, &verification_url);

        self.mailing
            .send_html(&to, &format!("Welcome to {}", self.app_name), &html)
            .await
    }
}
