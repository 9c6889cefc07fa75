//! Message delivery through a GOV.UK Notify compatible API.
//!
//! [`NotifyClient`] posts one templated email or SMS per call. Every request
//! carries a freshly signed HS256 bearer token derived from the API key,
//! whose format is `{key_name}-{service_id}-{secret}` with both the service
//! id and the secret being 36-character UUIDs.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use shiftwatch_core::ports::Dispatcher;
use shiftwatch_core::template::Personalisation;
use shiftwatch_core::CoreError;

use crate::config::{self, ConfigError};
use crate::delivery::TemplateIds;

const DEFAULT_API_URL: &str = "https://api.notifications.service.gov.uk";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Length of the service id and secret segments of an API key.
const UUID_LEN: usize = 36;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Notify returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The bearer token could not be signed.
    #[error("Token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The API key does not have the `{name}-{service_id}-{secret}` shape.
    #[error("Malformed Notify API key")]
    InvalidKey,
}

impl From<NotifyError> for CoreError {
    fn from(e: NotifyError) -> Self {
        CoreError::Dispatch(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NotifyConfig {
    pub base_url: String,
    pub api_key: String,
    pub email_template_id: String,
    pub sms_template_id: String,
    pub timeout: Duration,
}

impl NotifyConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                   | Required | Default                                    |
    /// |----------------------------|----------|--------------------------------------------|
    /// | `NOTIFY_API_URL`           | no       | `https://api.notifications.service.gov.uk` |
    /// | `NOTIFY_API_KEY`           | yes      | —                                          |
    /// | `NOTIFY_EMAIL_TEMPLATE_ID` | yes      | —                                          |
    /// | `NOTIFY_SMS_TEMPLATE_ID`   | yes      | —                                          |
    /// | `HTTP_TIMEOUT_SECS`        | no       | `30`                                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config::or_default("NOTIFY_API_URL", DEFAULT_API_URL),
            api_key: config::required("NOTIFY_API_KEY")?,
            email_template_id: config::required("NOTIFY_EMAIL_TEMPLATE_ID")?,
            sms_template_id: config::required("NOTIFY_SMS_TEMPLATE_ID")?,
            timeout: Duration::from_secs(config::parsed_or(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }

    pub fn template_ids(&self) -> TemplateIds {
        TemplateIds {
            email: self.email_template_id.clone(),
            sms: self.sms_template_id.clone(),
        }
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("email_template_id", &self.email_template_id)
            .field("sms_template_id", &self.sms_template_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// API key / token
// ---------------------------------------------------------------------------

/// Service id and signing secret taken from an API key.
#[derive(Clone, PartialEq, Eq)]
struct ApiKey {
    service_id: String,
    secret: String,
}

impl ApiKey {
    fn parse(key: &str) -> Result<Self, NotifyError> {
        let key = key.trim();
        // `-{service_id}-{secret}` at the end, with a non-empty name before.
        let tail = 2 * UUID_LEN + 1;
        if !key.is_ascii() || key.len() <= tail + 1 {
            return Err(NotifyError::InvalidKey);
        }

        let secret_start = key.len() - UUID_LEN;
        let service_start = secret_start - 1 - UUID_LEN;
        let bytes = key.as_bytes();
        if bytes[secret_start - 1] != b'-' || bytes[service_start - 1] != b'-' {
            return Err(NotifyError::InvalidKey);
        }

        Ok(Self {
            service_id: key[service_start..secret_start - 1].to_string(),
            secret: key[secret_start..].to_string(),
        })
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("service_id", &self.service_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    iat: i64,
}

fn sign_token(key: &ApiKey, issued_at: i64) -> Result<String, NotifyError> {
    let claims = Claims {
        iss: key.service_id.clone(),
        iat: issued_at,
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.secret.as_bytes()),
    )?;
    Ok(token)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    template_id: &'a str,
    email_address: &'a str,
    personalisation: BTreeMap<String, String>,
    reference: String,
}

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    template_id: &'a str,
    phone_number: &'a str,
    personalisation: BTreeMap<String, String>,
    reference: String,
}

// ---------------------------------------------------------------------------
// NotifyClient
// ---------------------------------------------------------------------------

/// [`Dispatcher`] backed by the Notify HTTP API.
pub struct NotifyClient {
    client: reqwest::Client,
    base_url: String,
    key: ApiKey,
}

impl NotifyClient {
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let key = ApiKey::parse(&config.api_key)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key,
        })
    }

    /// POST a JSON body to `path` with a freshly signed token.
    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), NotifyError> {
        let token = sign_token(&self.key, chrono::Utc::now().timestamp())?;
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for NotifyClient {
    async fn send_email(
        &self,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError> {
        let request = EmailRequest {
            template_id,
            email_address: address,
            personalisation: personalisation.to_map(),
            reference: uuid::Uuid::new_v4().to_string(),
        };
        self.post("/v2/notifications/email", &request).await?;
        tracing::info!(
            reference = %request.reference,
            lines = personalisation.filled(),
            "Summary email sent"
        );
        Ok(())
    }

    async fn send_sms(
        &self,
        template_id: &str,
        address: &str,
        personalisation: &Personalisation,
    ) -> Result<(), CoreError> {
        let request = SmsRequest {
            template_id,
            phone_number: address,
            personalisation: personalisation.to_map(),
            reference: uuid::Uuid::new_v4().to_string(),
        };
        self.post("/v2/notifications/sms", &request).await?;
        tracing::info!(
            reference = %request.reference,
            lines = personalisation.filled(),
            "Summary SMS sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
