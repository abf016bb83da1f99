use anyhow::Context;
use authbridge_config::Oauth2Config;
use authbridge_models::{OAuth2Provider, RegistrationData};
use serde::Deserialize;

use crate::error::AuthError;

/// Provider URLs, split out so tests can point the service at a mock server.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub facebook_token_url: String,
    pub facebook_profile_url: String,
    pub google_token_url: String,
    pub google_profile_url: String,
    pub linkedin_token_url: String,
    pub linkedin_profile_url: String,
    pub linkedin_email_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        ProviderEndpoints {
            facebook_token_url: "https://graph.facebook.com/v4.0/oauth/access_token".to_string(),
            facebook_profile_url: "https://graph.facebook.com/me".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_profile_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            linkedin_token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
            linkedin_profile_url: "https://api.linkedin.com/v2/me".to_string(),
            linkedin_email_url: "https://api.linkedin.com/v2/emailAddress".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: String,
    given_name: String,
    family_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct LinkedInProfile {
    id: String,
    #[serde(rename = "localizedFirstName")]
    localized_first_name: String,
    #[serde(rename = "localizedLastName")]
    localized_last_name: String,
}

#[derive(Debug, Deserialize)]
struct LinkedInEmailElements {
    elements: Vec<LinkedInEmailElement>,
}

#[derive(Debug, Deserialize)]
struct LinkedInEmailElement {
    #[serde(rename = "handle~")]
    handle: LinkedInEmailHandle,
}

#[derive(Debug, Deserialize)]
struct LinkedInEmailHandle {
    #[serde(rename = "emailAddress")]
    email_address: String,
}

/// Exchanges authorization codes and fetches provider profiles. Each
/// provider has its own token-endpoint convention: Facebook takes query
/// parameters on a GET, Google a JSON POST and LinkedIn a form POST.
#[derive(Clone)]
pub struct OAuth2Service {
    client: reqwest::Client,
    config: Oauth2Config,
    endpoints: ProviderEndpoints,
}

impl OAuth2Service {
    pub fn new(config: Oauth2Config) -> Self {
        Self::with_endpoints(config, ProviderEndpoints::default())
    }

    pub fn with_endpoints(config: Oauth2Config, endpoints: ProviderEndpoints) -> Self {
        OAuth2Service {
            client: reqwest::Client::new(),
            config,
            endpoints,
        }
    }

    /// Resolves an authorization code into the identity fields registration
    /// needs. Any provider-side failure surfaces as an internal error; the
    /// code is single-use and nothing here is actionable for the caller.
    pub async fn fetch_registration_data(
        &self,
        provider: OAuth2Provider,
        code: &str,
    ) -> Result<RegistrationData, AuthError> {
        let access_token = self.exchange_code(provider, code).await?;
        self.fetch_identity(provider, &access_token).await
    }

    pub async fn exchange_code(
        &self,
        provider: OAuth2Provider,
        code: &str,
    ) -> Result<String, AuthError> {
        let response = match provider {
            OAuth2Provider::Facebook => {
                self.client
                    .get(&self.endpoints.facebook_token_url)
                    .query(&[
                        ("client_id", self.config.facebook.client_id.as_str()),
                        ("client_secret", self.config.facebook.client_secret.as_str()),
                        ("redirect_uri", self.config.redirect_url.as_str()),
                        ("code", code),
                    ])
                    .send()
                    .await
            }
            OAuth2Provider::Google => {
                self.client
                    .post(&self.endpoints.google_token_url)
                    .json(&serde_json::json!({
                        "code": code,
                        "client_id": self.config.google.client_id,
                        "client_secret": self.config.google.client_secret,
                        "redirect_uri": self.config.redirect_url,
                        "grant_type": "authorization_code",
                    }))
                    .send()
                    .await
            }
            OAuth2Provider::LinkedIn => {
                self.client
                    .post(&self.endpoints.linkedin_token_url)
                    .form(&[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("redirect_uri", self.config.redirect_url.as_str()),
                        ("client_id", self.config.linkedin.client_id.as_str()),
                        ("client_secret", self.config.linkedin.client_secret.as_str()),
                    ])
                    .send()
                    .await
            }
        };

        let token: AccessTokenResponse = response
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("{provider} code exchange failed"))?
            .json()
            .await
            .with_context(|| format!("{provider} token response is malformed"))?;

        Ok(token.access_token)
    }

    pub async fn fetch_identity(
        &self,
        provider: OAuth2Provider,
        access_token: &str,
    ) -> Result<RegistrationData, AuthError> {
        match provider {
            OAuth2Provider::Facebook => {
                let profile: FacebookProfile = self
                    .client
                    .get(&self.endpoints.facebook_profile_url)
                    .query(&[
                        ("fields", "id,first_name,last_name,email"),
                        ("access_token", access_token),
                    ])
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .context("facebook profile request failed")?
                    .json()
                    .await
                    .context("facebook profile response is malformed")?;

                Ok(RegistrationData {
                    first_name: profile.first_name,
                    last_name: profile.last_name,
                    email: profile.email,
                    birth_date: None,
                    provider_user_id: Some(profile.id),
                })
            }
            OAuth2Provider::Google => {
                let profile: GoogleProfile = self
                    .client
                    .get(&self.endpoints.google_profile_url)
                    .query(&[("alt", "json"), ("access_token", access_token)])
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .context("google profile request failed")?
                    .json()
                    .await
                    .context("google profile response is malformed")?;

                Ok(RegistrationData {
                    first_name: profile.given_name,
                    last_name: profile.family_name,
                    email: profile.email,
                    birth_date: None,
                    provider_user_id: Some(profile.id),
                })
            }
            OAuth2Provider::LinkedIn => {
                // Profile and email live behind separate endpoints.
                let profile: LinkedInProfile = self
                    .client
                    .get(&self.endpoints.linkedin_profile_url)
                    .bearer_auth(access_token)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .context("linkedin profile request failed")?
                    .json()
                    .await
                    .context("linkedin profile response is malformed")?;

                let emails: LinkedInEmailElements = self
                    .client
                    .get(&self.endpoints.linkedin_email_url)
                    .query(&[
                        ("q", "members"),
                        ("projection", "(elements*(handle~))"),
                    ])
                    .bearer_auth(access_token)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .context("linkedin email request failed")?
                    .json()
                    .await
                    .context("linkedin email response is malformed")?;

                let email = emails
                    .elements
                    .into_iter()
                    .next()
                    .map(|element| element.handle.email_address)
                    .context("linkedin account has no email address")?;

                Ok(RegistrationData {
                    first_name: profile.localized_first_name,
                    last_name: profile.localized_last_name,
                    email,
                    birth_date: None,
                    provider_user_id: Some(profile.id),
                })
            }
        }
    }
}
