use crate::config::Config;
use crate::errors::AppError;
use crate::submission::{FormPayload, SubmissionSink};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Body shape of both success and error responses.
#[derive(Debug, Default, Deserialize)]
struct EndpointReply {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the enrollment backend.
#[derive(Clone)]
pub struct SubmissionClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl SubmissionClient {
    /// Creates a new `SubmissionClient`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Absolute URL the form is POSTed to.
    /// * `timeout` - Per-request timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let endpoint = Url::parse(endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create submission client: {}", e))
            })?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            &config.submit_url,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SubmissionSink for SubmissionClient {
    /// POSTs the payload as JSON.
    ///
    /// Any non-2xx status is a rejection, whatever the body says. The body's
    /// `message` field is read leniently on both paths.
    async fn submit(&self, payload: &FormPayload) -> Result<Option<String>, AppError> {
        tracing::info!("Posting enrollment to {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Enrollment request failed: {}", e);
                AppError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(AppError::from)?;

        if !status.is_success() {
            let reply: EndpointReply = serde_json::from_str(&body).unwrap_or_default();
            tracing::warn!("Enrollment endpoint returned {}: {}", status, body);
            return Err(AppError::SubmissionRejected {
                status: status.as_u16(),
                message: reply.message,
            });
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        let reply: EndpointReply = serde_json::from_str(&body).map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse submission response: {}", e))
        })?;

        Ok(reply.message)
    }
}
