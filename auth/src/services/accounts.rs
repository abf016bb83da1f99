use authbridge_models::{
    AuthMethod, LoginRequest, OAuth2Provider, Oauth2Token, RegisterRequest, RegistrationData, User,
};
use uuid::Uuid;

use crate::error::AuthError;
use crate::services::{hashing, verification, OAuth2Service, UserStore};

/// What registration did for an email that may already have an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// The email belongs to an existing user without a binding for this
    /// provider; attach a new login to it.
    AttachLogin,
    /// The incoming provider subject already backs one of the user's
    /// logins. Registering again is a no-op.
    AlreadyLinked,
}

/// Decides how a registration request relates to an already-existing account
/// with the same email. `provider_tokens` are the user's live bindings for
/// the requested provider only.
pub fn link_decision(
    method: AuthMethod,
    provider_tokens: &[Oauth2Token],
    provider_user_id: Option<&str>,
) -> Result<LinkDecision, AuthError> {
    match method {
        AuthMethod::Password => {
            // A second password identity on the same email is never allowed.
            Err(AuthError::Conflict("Email already exists".to_string()))
        }
        AuthMethod::Oauth2 => {
            let provider_user_id = provider_user_id
                .ok_or_else(|| AuthError::internal("oauth2 registration without a subject id"))?;

            if provider_tokens.is_empty() {
                return Ok(LinkDecision::AttachLogin);
            }
            if provider_tokens
                .iter()
                .any(|token| token.provider_user_id == provider_user_id)
            {
                return Ok(LinkDecision::AlreadyLinked);
            }
            Err(AuthError::Conflict(
                "provider user id not matched with saved provider user id".to_string(),
            ))
        }
    }
}

/// Outcome of a successful registration.
#[derive(Debug)]
pub struct RegisterOutcome {
    pub user: User,
    /// False when the request linked into (or matched) an existing account.
    pub created: bool,
}

/// Registration and login across both auth methods, including linking a
/// provider identity into an existing account that shares its email.
#[derive(Clone)]
pub struct AccountService {
    store: UserStore,
    oauth2: OAuth2Service,
}

impl AccountService {
    pub fn new(store: UserStore, oauth2: OAuth2Service) -> Self {
        AccountService { store, oauth2 }
    }

    /// Identity fields for the request: taken from the payload for the
    /// password method, fetched from the provider for oauth2.
    async fn resolve_registration_data(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegistrationData, AuthError> {
        match request.method {
            AuthMethod::Password => Ok(RegistrationData {
                first_name: require(&request.data.first_name, "firstName")?,
                last_name: require(&request.data.last_name, "lastName")?,
                email: require(&request.data.email, "email")?,
                birth_date: request.data.birth_date,
                provider_user_id: None,
            }),
            AuthMethod::Oauth2 => {
                let provider = self.require_provider(request.provider)?;
                let code = require(&request.data.code, "code")?;
                self.oauth2.fetch_registration_data(provider, &code).await
            }
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterOutcome, AuthError> {
        request.validate_for_method()?;
        let data = self.resolve_registration_data(request).await?;
        let credential = self.build_credential(request, &data).await?;

        match self.store.find_by_email(&data.email).await? {
            None => {
                let user = self
                    .store
                    .create_user_with_login(
                        crate::services::store::NewUser {
                            first_name: data.first_name,
                            last_name: data.last_name,
                            email: data.email,
                            birth_date: data.birth_date,
                            verification_code: verification::generate_verification_code(),
                        },
                        credential,
                    )
                    .await?;
                tracing::info!(user_id = %user.id, "registered new user");
                Ok(RegisterOutcome { user, created: true })
            }
            Some(existing) => {
                let provider_tokens = match request.method {
                    AuthMethod::Password => Vec::new(),
                    AuthMethod::Oauth2 => {
                        let provider = self.require_provider(request.provider)?;
                        let oauth2_login_ids: Vec<Uuid> = existing
                            .logins
                            .iter()
                            .filter(|login| login.method == AuthMethod::Oauth2)
                            .map(|login| login.id)
                            .collect();
                        self.store
                            .find_oauth2_tokens(&oauth2_login_ids, provider)
                            .await?
                    }
                };

                match link_decision(
                    request.method,
                    &provider_tokens,
                    data.provider_user_id.as_deref(),
                )? {
                    LinkDecision::AlreadyLinked => Ok(RegisterOutcome {
                        user: existing,
                        created: false,
                    }),
                    LinkDecision::AttachLogin => {
                        self.store
                            .create_login_for_user(existing.id, credential)
                            .await?;
                        tracing::info!(user_id = %existing.id, "attached new login to user");
                        let user = self
                            .store
                            .find_by_id(existing.id)
                            .await?
                            .ok_or_else(|| AuthError::internal("linked user row is missing"))?;
                        Ok(RegisterOutcome {
                            user,
                            created: false,
                        })
                    }
                }
            }
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<User, AuthError> {
        request.validate_for_method()?;
        match request.method {
            AuthMethod::Password => self.login_by_password(request).await,
            AuthMethod::Oauth2 => self.login_by_oauth2(request).await,
        }
    }

    /// Every failed step collapses into the same message so callers cannot
    /// probe which emails have accounts.
    async fn login_by_password(&self, request: &LoginRequest) -> Result<User, AuthError> {
        let failed = || AuthError::AuthFailed("Email and password not matched".to_string());

        let email = require(&request.credentials.email, "email")?;
        let password = require(&request.credentials.password, "password")?;

        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or_else(failed)?;

        let password_login = user
            .logins
            .iter()
            .find(|login| login.method == AuthMethod::Password)
            .ok_or_else(failed)?;

        let credential = self
            .store
            .find_active_password(password_login.id)
            .await?
            .ok_or_else(failed)?;

        if !hashing::verify_password(&password, &credential.hash).await? {
            return Err(failed());
        }

        Ok(user)
    }

    async fn login_by_oauth2(&self, request: &LoginRequest) -> Result<User, AuthError> {
        let provider = self.require_provider(request.provider)?;
        let code = require(&request.credentials.code, "code")?;
        let data = self.oauth2.fetch_registration_data(provider, &code).await?;

        self.store
            .find_by_email(&data.email)
            .await?
            .ok_or_else(|| AuthError::AuthFailed("User is not found".to_string()))
    }

    async fn build_credential(
        &self,
        request: &RegisterRequest,
        data: &RegistrationData,
    ) -> Result<crate::services::store::NewCredential, AuthError> {
        match request.method {
            AuthMethod::Password => {
                let password = require(&request.data.password, "password")?;
                let hash = hashing::hash_password(&password).await?;
                Ok(crate::services::store::NewCredential::Password { hash })
            }
            AuthMethod::Oauth2 => {
                let provider = self.require_provider(request.provider)?;
                let provider_user_id = data.provider_user_id.clone().ok_or_else(|| {
                    AuthError::internal("provider profile is missing a subject id")
                })?;
                Ok(crate::services::store::NewCredential::Oauth2 {
                    provider,
                    provider_user_id,
                })
            }
        }
    }

    fn require_provider(
        &self,
        provider: Option<OAuth2Provider>,
    ) -> Result<OAuth2Provider, AuthError> {
        provider.ok_or_else(|| AuthError::UserInput("provider is required".to_string()))
    }
}

fn require(value: &Option<String>, name: &str) -> Result<String, AuthError> {
    value
        .clone()
        .ok_or_else(|| AuthError::UserInput(format!("{name} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn token(provider_user_id: &str) -> Oauth2Token {
        let now = Utc::now();
        Oauth2Token {
            id: Uuid::new_v4(),
            provider_user_id: provider_user_id.to_string(),
            provider: OAuth2Provider::Google,
            user_agent: None,
            ip_address: None,
            login_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn password_method_against_existing_email_is_a_conflict() {
        let result = link_decision(AuthMethod::Password, &[], None);
        match result {
            Err(AuthError::Conflict(message)) => assert_eq!(message, "Email already exists"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn oauth2_with_no_binding_for_provider_attaches_a_login() {
        let decision = link_decision(AuthMethod::Oauth2, &[], Some("subject-1")).unwrap();
        assert_eq!(decision, LinkDecision::AttachLogin);
    }

    #[test]
    fn oauth2_with_matching_subject_is_idempotent() {
        let tokens = vec![token("subject-1")];
        let decision = link_decision(AuthMethod::Oauth2, &tokens, Some("subject-1")).unwrap();
        assert_eq!(decision, LinkDecision::AlreadyLinked);
    }

    #[test]
    fn oauth2_with_different_subject_is_a_conflict() {
        let tokens = vec![token("subject-1")];
        let result = link_decision(AuthMethod::Oauth2, &tokens, Some("subject-2"));
        match result {
            Err(AuthError::Conflict(message)) => {
                assert_eq!(
                    message,
                    "provider user id not matched with saved provider user id"
                );
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn oauth2_matching_any_of_several_bindings_is_idempotent() {
        let tokens = vec![token("subject-1"), token("subject-2")];
        let decision = link_decision(AuthMethod::Oauth2, &tokens, Some("subject-2")).unwrap();
        assert_eq!(decision, LinkDecision::AlreadyLinked);
    }
}
