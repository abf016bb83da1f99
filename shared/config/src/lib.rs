//! Typed environment configuration, loaded once at process start.
//!
//! Every required variable missing from the environment aborts startup with
//! an error naming the variable instead of failing later mid-request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. Empty list means permissive (dev mode).
    pub whitelist_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oauth2Config {
    pub redirect_url: String,
    pub facebook: ProviderCredentials,
    pub google: ProviderCredentials,
    pub linkedin: ProviderCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub user_token_secret: String,
    /// Base URL of the frontend hosting the verification landing page.
    pub frontend_domain: String,
    /// Path appended to `frontend_domain` in verification links.
    pub verify_user_url_path: String,
    pub oauth2: Oauth2Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailIdentity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailingConfig {
    pub sendgrid_api_key: String,
    pub registration_from: EmailIdentity,
    pub registration_reply_to: Option<EmailIdentity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub mailing: MailingConfig,
    pub app: AppInfo,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: optional("SERVER_PORT")
                    .map(|value| value.parse::<u16>().context("SERVER_PORT is not a valid port"))
                    .transpose()?
                    .unwrap_or(3000),
                whitelist_origins: optional("SERVER_WHITELIST_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(str::trim)
                            .filter(|origin| !origin.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            auth: AuthConfig {
                user_token_secret: required("AUTH_USER_TOKEN_SECRET")?,
                frontend_domain: required("AUTH_FRONTEND_DOMAIN")?,
                verify_user_url_path: optional("AUTH_VERIFY_USER_URL_PATH")
                    .unwrap_or_else(|| "/verify".to_string()),
                oauth2: Oauth2Config {
                    redirect_url: required("AUTH_OAUTH2_REDIRECT_URL")?,
                    facebook: provider_credentials("FACEBOOK")?,
                    google: provider_credentials("GOOGLE")?,
                    linkedin: provider_credentials("LINKED_IN")?,
                },
            },
            mailing: MailingConfig {
                sendgrid_api_key: required("MAILING_SENDGRID_API_KEY")?,
                registration_from: EmailIdentity {
                    name: required("MAILING_REGISTRATION_FROM_NAME")?,
                    email: required("MAILING_REGISTRATION_FROM_EMAIL")?,
                },
                registration_reply_to: match (
                    optional("MAILING_REGISTRATION_REPLY_TO_NAME"),
                    optional("MAILING_REGISTRATION_REPLY_TO_EMAIL"),
                ) {
                    (Some(name), Some(email)) => Some(EmailIdentity { name, email }),
                    _ => None,
                },
            },
            app: AppInfo {
                name: optional("APP_NAME").unwrap_or_else(|| "authbridge".to_string()),
                version: optional("APP_VERSION").unwrap_or_else(|| "0.1.0".to_string()),
            },
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("required environment variable {key} is not set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn provider_credentials(provider: &str) -> Result<ProviderCredentials> {
    Ok(ProviderCredentials {
        client_id: required(&format!("AUTH_OAUTH2_{provider}_CLIENT_ID"))?,
        client_secret: required(&format!("AUTH_OAUTH2_{provider}_CLIENT_SECRET"))?,
    })
}
