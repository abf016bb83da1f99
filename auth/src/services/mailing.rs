use anyhow::Context;
use authbridge_config::{EmailIdentity, MailingConfig};
use serde_json::json;

use crate::error::AuthError;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Outbound email over the SendGrid v3 REST API.
#[derive(Clone)]
pub struct MailingService {
    client: reqwest::Client,
    config: MailingConfig,
    api_url: String,
}

impl MailingService {
    pub fn new(config: MailingConfig) -> Self {
        Self::with_api_url(config, SENDGRID_API_URL.to_string())
    }

    pub fn with_api_url(config: MailingConfig, api_url: String) -> Self {
        MailingService {
            client: reqwest::Client::new(),
            config,
            api_url,
        }
    }

    pub async fn send_html(
        &self,
        to: &EmailIdentity,
        subject: &str,
        html: &str,
    ) -> Result<(), AuthError> {
        let from = &self.config.registration_from;
        let reply_to = self.config.registration_reply_to.as_ref().unwrap_or(from);

        let body = json!({
            "personalizations": [
                {
                    "to": [{ "name": to.name, "email": to.email }],
                    "subject": subject,
                }
            ],
            "content": [
                { "type": "text/html", "value": html }
            ],
            "from": { "name": from.name, "email": from.email },
            "reply_to": { "name": reply_to.name, "email": reply_to.email },
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .context("email request failed")?;

        // SendGrid acknowledges accepted mail with 202 and nothing else.
        if response.status().as_u16() != 202 {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthError::internal(format!(
                "email provider rejected the message with {status}: {detail}"
            )));
        }

        Ok(())
    }
}
