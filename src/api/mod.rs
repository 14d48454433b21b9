//! Backend access. Everything above this module talks to the backend through
//! [`QuoteBackend`]; [`ApiClient`] is the HTTP implementation.

pub mod client;
pub mod models;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use client::ApiClient;
pub use models::{
    AnalysisUpload, BuildingRecord, EmailRequest, EmailResponse, HealthStatus, HeatingDemand,
    OfferDocumentRequest, OfferDocumentResponse,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timeout")]
    Timeout,
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Status reported for requests aborted by the client-side timer.
    pub const TIMEOUT_STATUS: u16 = 408;

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Timeout => Some(Self::TIMEOUT_STATUS),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(err) => err.status().map(|status| status.as_u16()),
            ApiError::Decode(_) | ApiError::Cancelled => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }
}

/// A response body, parsed as JSON when the server says it is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.into_json()?)?)
    }
}

/// Backend operations the quote flows depend on.
///
/// Futures are awaited in place by the flows, so they do not need `Send`.
#[allow(async_fn_in_trait)]
pub trait QuoteBackend {
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    /// Uploads a project PDF; returns the raw analysis response.
    async fn analyze_pdf(&self, upload: AnalysisUpload) -> Result<Value, ApiError>;

    async fn analysis_status(&self, analysis_id: &str) -> Result<Value, ApiError>;

    async fn cancel_analysis(&self, analysis_id: &str) -> Result<Value, ApiError>;

    async fn calculate_heating(&self, building: &BuildingRecord) -> Result<HeatingDemand, ApiError>;

    async fn heating_service_health(&self) -> Result<Value, ApiError>;

    async fn send_email(&self, request: &EmailRequest) -> Result<EmailResponse, ApiError>;

    async fn generate_offer_document(
        &self,
        request: &OfferDocumentRequest,
    ) -> Result<OfferDocumentResponse, ApiError>;
}
