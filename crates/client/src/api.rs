//! REST client for the backend's social publishing endpoints.
//!
//! Wraps content generation, draft persistence and batch publishing using
//! [`reqwest`], and maps transport/HTTP failures onto
//! [`ServiceError`] so the workflow never sees `reqwest` types.

use std::time::Duration;

use async_trait::async_trait;
use listcast_core::draft::{Draft, DraftContent, DraftPatch};
use listcast_core::generation::{GeneratedDraft, GenerationRequest};
use listcast_core::publishing::{JobReport, PublishReceipt, PublishRequest};
use listcast_core::services::{ContentGenerator, DraftRepository, Publisher, ServiceError};
use reqwest::{Method, Url};

use crate::config::ClientConfig;
use crate::dto::{DraftsResponse, ErrorBody, GenerateResponse, ImproveBody, JobStatusResponse};

/// HTTP client for one backend deployment.
#[derive(Debug)]
pub struct BackendApi {
    client: reqwest::Client,
    base: Url,
    api_token: Option<String>,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL cannot carry path segments.
    #[error("Invalid backend URL '{0}'")]
    InvalidBaseUrl(String),

    /// The HTTP request itself failed (network, DNS, TLS, decode, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidBaseUrl(url) => ServiceError::Network(format!("invalid URL {url}")),
            ApiError::Request(e) if e.is_decode() => ServiceError::Decode(e.to_string()),
            ApiError::Request(e) => ServiceError::Network(e.to_string()),
            ApiError::ApiError { status, body } => ServiceError::Api {
                status,
                message: ErrorBody::message_from(&body),
            },
        }
    }
}

impl BackendApi {
    /// Build a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_client(client, config)
    }

    /// Build a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_url)
            .map_err(|_| ApiError::InvalidBaseUrl(config.api_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.api_url.clone()));
        }
        Ok(Self {
            client,
            base,
            api_token: config.api_token.clone(),
        })
    }

    /// Resolve `segments` below the base URL. Segments are percent-encoded,
    /// so ids containing `/` cannot escape their path position.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ---- private helpers ----

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        let builder = self
            .client
            .request(method, url)
            .header("x-request-id", request_id);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self.request(method, url).json(body).send().await?;
        Self::parse_response(response).await
    }
}

// ---------------------------------------------------------------------------
// Collaborator implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ContentGenerator for BackendApi {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedDraft>, ServiceError> {
        let url = self.endpoint(&["api", "social", "generate"])?;
        tracing::debug!(
            property_id = %request.property_id,
            language = %request.language,
            channels = request.channels.len(),
            "Requesting content generation",
        );
        let response: GenerateResponse = self.send_json(Method::POST, url, request).await?;
        Ok(response.drafts)
    }

    async fn improve_content(
        &self,
        draft: &Draft,
        instruction: &str,
    ) -> Result<DraftContent, ServiceError> {
        let url = self.endpoint(&["api", "social", "improve"])?;
        let body = ImproveBody {
            draft_id: draft.id.as_deref(),
            property_id: &draft.property_id,
            language: &draft.language,
            channel: draft.channel,
            title: &draft.title,
            body: &draft.body,
            hashtags: &draft.hashtags,
            instruction,
        };
        Ok(self.send_json(Method::POST, url, &body).await?)
    }
}

#[async_trait]
impl DraftRepository for BackendApi {
    async fn get_drafts(&self, property_id: &str) -> Result<Vec<Draft>, ServiceError> {
        let url = self.endpoint(&["api", "social", "drafts"])?;
        let response = self
            .request(Method::GET, url)
            .query(&[("property_id", property_id)])
            .send()
            .await
            .map_err(ApiError::from)?;
        let drafts: DraftsResponse = Self::parse_response(response).await?;
        Ok(drafts.into_drafts())
    }

    async fn update_draft(
        &self,
        draft_id: &str,
        patch: &DraftPatch,
    ) -> Result<Draft, ServiceError> {
        let url = self.endpoint(&["api", "social", "drafts", draft_id])?;
        Ok(self.send_json(Method::PATCH, url, patch).await?)
    }
}

#[async_trait]
impl Publisher for BackendApi {
    async fn publish_drafts(
        &self,
        request: &PublishRequest,
    ) -> Result<PublishReceipt, ServiceError> {
        let url = self.endpoint(&["api", "social", "publish"])?;
        let receipt: PublishReceipt = self.send_json(Method::POST, url, request).await?;
        tracing::info!(
            job_id = %receipt.job_id,
            drafts = request.draft_ids.len(),
            scheduled = request.schedule_at.is_some(),
            "Publish batch accepted",
        );
        Ok(receipt)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobReport, ServiceError> {
        let url = self.endpoint(&["api", "social", "publish", "jobs", job_id])?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(ApiError::from)?;
        let status: JobStatusResponse = Self::parse_response(response).await?;
        Ok(status.into())
    }
}
