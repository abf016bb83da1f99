use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Length of the opaque code mailed out to verify account ownership.
pub const VERIFICATION_CODE_LENGTH: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UserStatus {
    PendingVerification,
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::PendingVerification => "pending_verification",
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_verification" => Some(UserStatus::PendingVerification),
            "active" => Some(UserStatus::Active),
            "disabled" => Some(UserStatus::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Password,
    Oauth2,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Password => "password",
            AuthMethod::Oauth2 => "oauth2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "password" => Some(AuthMethod::Password),
            "oauth2" => Some(AuthMethod::Oauth2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OAuth2Provider {
    #[serde(rename = "facebook")]
    Facebook,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "linkedIn", alias = "linkedin")]
    LinkedIn,
}

impl OAuth2Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuth2Provider::Facebook => "facebook",
            OAuth2Provider::Google => "google",
            OAuth2Provider::LinkedIn => "linkedin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "facebook" => Some(OAuth2Provider::Facebook),
            "google" => Some(OAuth2Provider::Google),
            "linkedin" | "linkedIn" => Some(OAuth2Provider::LinkedIn),
            _ => None,
        }
    }
}

impl std::fmt::Display for OAuth2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity root. Owns zero-or-more logins; `email` is a denormalized cache
/// of the primary login's email address. Rows are soft-deleted; a populated
/// `deleted_at` never reaches callers of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub status: UserStatus,
    pub verification_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub logins: Vec<Login>,
}

impl User {
    pub fn public_data(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            birth_date: self.birth_date,
        }
    }
}

/// One authentication method instance bound to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    pub id: Uuid,
    pub method: AuthMethod,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Credential material for a password login. Historical rows are kept;
/// only one row per login is active.
#[derive(Debug, Clone)]
pub struct PasswordCredential {
    pub id: Uuid,
    pub hash: String,
    pub is_active: bool,
    pub login_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Identity binding for an OAuth2 login. `provider_user_id` is the
/// provider-assigned subject id and the authoritative linking key.
#[derive(Debug, Clone)]
pub struct Oauth2Token {
    pub id: Uuid,
    pub provider_user_id: String,
    pub provider: OAuth2Provider,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub login_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Password-reset audit record. The reset flow itself is not wired to the
/// HTTP surface yet; the record shape is kept for it.
#[derive(Debug, Clone)]
pub struct ResetPassword {
    pub id: Uuid,
    pub reset_code_hash: String,
    pub previous_password_hash: Option<String>,
    pub login_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The user fields safe to return to clients and embed in tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// JWT payload. Expiry is an explicit claim checked by callers, not the
/// signing library's `exp` field, so the policy can change without
/// re-keying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub expiration_date: DateTime<Utc>,
}

impl UserClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration_date
    }
}

/// Identity fields resolved during registration: straight from the payload
/// for the password method, from the provider profile for oauth2.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub provider_user_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    #[validate(length(min = 2, max = 255, message = "firstName must be between 2 and 255 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 255, message = "lastName must be between 2 and 255 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "email format is invalid"))]
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(min = 6, max = 64, message = "password must be between 6 and 64 characters"))]
    pub password: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub method: AuthMethod,
    pub provider: Option<OAuth2Provider>,
    pub data: RegisterData,
}

impl RegisterRequest {
    /// Schema check for the selected method, collecting every violation
    /// instead of stopping at the first.
    pub fn validate_for_method(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.data.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        match self.method {
            AuthMethod::Password => {
                if self.data.first_name.is_none() {
                    errors.add("first_name", required_error("firstName is required"));
                }
                if self.data.last_name.is_none() {
                    errors.add("last_name", required_error("lastName is required"));
                }
                if self.data.email.is_none() {
                    errors.add("email", required_error("email is required"));
                }
                if self.data.password.is_none() {
                    errors.add("password", required_error("password is required"));
                }
                match self.data.birth_date {
                    None => errors.add("birth_date", required_error("birthDate is required")),
                    Some(birth_date) => {
                        if birth_date > Utc::now().date_naive() {
                            errors.add(
                                "birth_date",
                                invalid_error("birthDate cannot be in the future"),
                            );
                        }
                    }
                }
            }
            AuthMethod::Oauth2 => {
                if self.data.code.is_none() {
                    errors.add("code", required_error("code is required"));
                }
                if self.provider.is_none() {
                    errors.add("provider", required_error("provider is required"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    #[validate(email(message = "email format is invalid"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub method: AuthMethod,
    pub provider: Option<OAuth2Provider>,
    pub credentials: LoginCredentials,
}

impl LoginRequest {
    pub fn validate_for_method(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.credentials.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        match self.method {
            AuthMethod::Password => {
                if self.credentials.email.is_none() {
                    errors.add("email", required_error("email is required"));
                }
                if self.credentials.password.is_none() {
                    errors.add("password", required_error("password is required"));
                }
            }
            AuthMethod::Oauth2 => {
                if self.credentials.code.is_none() {
                    errors.add("code", required_error("code is required"));
                }
                if self.provider.is_none() {
                    errors.add("provider", required_error("provider is required"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[validate(length(min = 1, message = "verificationCode is required"))]
    pub verification_code: String,
}

/// Body of successful register/login responses: public user fields plus the
/// issued token and its expiry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponseData {
    #[serde(flatten)]
    pub user: UserPublic,
    pub expiration_date: DateTime<Utc>,
    pub token: String,
}

fn required_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("required");
    error.message = Some(message.into());
    error
}

fn invalid_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("invalid");
    error.message = Some(message.into());
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_register_request() -> RegisterRequest {
        RegisterRequest {
            method: AuthMethod::Password,
            provider: None,
            data: RegisterData {
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                email: Some("ada@example.com".to_string()),
                birth_date: Some(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()),
                password: Some("secret1".to_string()),
                code: None,
            },
        }
    }

    #[test]
    fn password_registration_accepts_valid_payload() {
        assert!(password_register_request().validate_for_method().is_ok());
    }

    #[test]
    fn password_registration_collects_all_missing_fields() {
        let request = RegisterRequest {
            method: AuthMethod::Password,
            provider: None,
            data: RegisterData {
                first_name: None,
                last_name: None,
                email: None,
                birth_date: None,
                password: None,
                code: None,
            },
        };

        let errors = request.validate_for_method().unwrap_err();
        let fields = errors.field_errors();
        for field in ["first_name", "last_name", "email", "password", "birth_date"] {
            assert!(fields.contains_key(field), "missing violation for {field}");
        }
    }

    #[test]
    fn password_registration_rejects_future_birth_date() {
        let mut request = password_register_request();
        request.data.birth_date = Some(Utc::now().date_naive() + chrono::Duration::days(2));
        let errors = request.validate_for_method().unwrap_err();
        assert!(errors.field_errors().contains_key("birth_date"));
    }

    #[test]
    fn password_registration_rejects_short_password() {
        let mut request = password_register_request();
        request.data.password = Some("short".to_string());
        let errors = request.validate_for_method().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn oauth2_registration_requires_code_and_provider() {
        let request = RegisterRequest {
            method: AuthMethod::Oauth2,
            provider: None,
            data: RegisterData {
                first_name: None,
                last_name: None,
                email: None,
                birth_date: None,
                password: None,
                code: None,
            },
        };

        let errors = request.validate_for_method().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("code"));
        assert!(fields.contains_key("provider"));
    }

    #[test]
    fn login_requires_method_specific_credentials() {
        let request = LoginRequest {
            method: AuthMethod::Password,
            provider: None,
            credentials: LoginCredentials {
                email: None,
                password: None,
                code: None,
            },
        };

        let errors = request.validate_for_method().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn provider_parses_both_spellings_of_linkedin() {
        assert_eq!(OAuth2Provider::parse("linkedIn"), Some(OAuth2Provider::LinkedIn));
        assert_eq!(OAuth2Provider::parse("linkedin"), Some(OAuth2Provider::LinkedIn));
        assert_eq!(OAuth2Provider::parse("github"), None);
    }

    #[test]
    fn register_request_deserializes_camel_case_payload() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{
                "method": "oauth2",
                "provider": "linkedIn",
                "data": { "code": "abc123" }
            }"#,
        )
        .unwrap();

        assert_eq!(request.method, AuthMethod::Oauth2);
        assert_eq!(request.provider, Some(OAuth2Provider::LinkedIn));
        assert_eq!(request.data.code.as_deref(), Some("abc123"));
    }
}
