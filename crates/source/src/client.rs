use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use riskline_core::config::SourceConfig;

use crate::envelope::parse_policy_envelope;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token request failed with status {status}: {body}")]
    Token { status: u16, body: String },
    #[error("policy request failed with status {status}: {body}")]
    Fetch { status: u16, body: String },
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
    #[error("source is not configured: missing {0}")]
    NotConfigured(&'static str),
}

/// Supplier of raw policy documents. The pipeline does not care about
/// transport, pagination, or authentication beyond this seam.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Value>, SourceError>;
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Policy-administration API client: client-credentials token exchange,
/// then a bearer-authenticated POST against the policies handler.
pub struct HttpPolicySource {
    http: Client,
    config: SourceConfig,
}

impl HttpPolicySource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self { http, config })
    }

    fn require_configured(&self) -> Result<(), SourceError> {
        if self.config.token_url.trim().is_empty() {
            return Err(SourceError::NotConfigured("source.token_url"));
        }
        if self.config.api_url.trim().is_empty() {
            return Err(SourceError::NotConfigured("source.api_url"));
        }
        if self.config.client_id.trim().is_empty() {
            return Err(SourceError::NotConfigured("source.client_id"));
        }
        if self.config.client_secret.expose_secret().trim().is_empty() {
            return Err(SourceError::NotConfigured("source.client_secret"));
        }
        Ok(())
    }

    async fn bearer_token(&self) -> Result<String, SourceError> {
        let request = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
            audience: &self.config.audience,
            grant_type: "client_credentials",
        };

        let response = self.http.post(&self.config.token_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Token { status: status.as_u16(), body });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl PolicySource for HttpPolicySource {
    async fn fetch_all(&self) -> Result<Vec<Value>, SourceError> {
        self.require_configured()?;

        let token = self.bearer_token().await?;
        let response = self.http.post(&self.config.api_url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Fetch { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await?;
        let documents = parse_policy_envelope(&payload)?;
        info!(
            event_name = "source.fetch.completed",
            document_count = documents.len(),
            "fetched policy documents from source api"
        );
        Ok(documents)
    }
}

/// Fixed in-memory batch, for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct StaticPolicySource {
    documents: Vec<Value>,
}

impl StaticPolicySource {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl PolicySource for StaticPolicySource {
    async fn fetch_all(&self) -> Result<Vec<Value>, SourceError> {
        Ok(self.documents.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use riskline_core::config::SourceConfig;

    use super::{HttpPolicySource, PolicySource, SourceError, StaticPolicySource};

    fn config() -> SourceConfig {
        SourceConfig {
            token_url: String::new(),
            api_url: String::new(),
            audience: String::new(),
            client_id: String::new(),
            client_secret: String::new().into(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn unconfigured_source_fails_before_any_request() {
        let source = HttpPolicySource::new(config()).expect("build client");
        let error = source.fetch_all().await.expect_err("should fail without configuration");
        assert!(matches!(error, SourceError::NotConfigured("source.token_url")));
    }

    #[tokio::test]
    async fn partially_configured_source_names_the_missing_field() {
        let mut partial = config();
        partial.token_url = "https://auth.example.com/oauth/token".to_string();
        partial.api_url = "https://api.example.com/policies".to_string();
        partial.client_id = "riskline-dev".to_string();

        let source = HttpPolicySource::new(partial).expect("build client");
        let error = source.fetch_all().await.expect_err("should fail without a secret");
        assert!(matches!(error, SourceError::NotConfigured("source.client_secret")));
    }

    #[tokio::test]
    async fn static_source_returns_its_batch() {
        let source = StaticPolicySource::new(vec![json!({"id": "P-1"}), json!({"id": "P-2"})]);
        let documents = source.fetch_all().await.expect("fetch");
        assert_eq!(documents.len(), 2);
    }
}
