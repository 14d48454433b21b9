use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Method, RequestBuilder, StatusCode,
};
use serde::Serialize;
use serde_json::Value;

use crate::settings::ClientSettings;
use crate::{log_debug, log_warn};

use super::models::{
    AnalysisUpload, BuildingRecord, EmailRequest, EmailResponse, HealthStatus, HeatingDemand,
    OfferDocumentRequest, OfferDocumentResponse, ANALYSIS_PATH, ANALYSIS_STATUS_PATH,
    ANALYZE_PDF_PATH, EMAIL_PATH, HEALTH_PATH, HEATING_CALCULATE_PATH, HEATING_HEALTH_PATH,
    OFFER_DOCUMENT_PATH,
};
use super::{ApiError, Payload, QuoteBackend};

const ENABLE_LOGS: bool = true;

/// HTTP client for the quote backend. Every request is aborted after the
/// configured timeout (30 s by default, 10 s for health checks) and reported
/// as [`ApiError::Timeout`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    health_timeout: Duration,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        log_debug!("APIClient initialized with base URL {}", settings.base_url);

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.request_timeout(),
            health_timeout: settings.health_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn builder(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        self.http.request(method, self.url(path)).timeout(timeout)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Payload, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        log_debug!("Response: {status} from {}", response.url());

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let body = response.text().await?;

        if !status.is_success() {
            log_warn!("Request failed with {status}: {body}");
            return Err(http_error(status, &body));
        }

        if is_json {
            Ok(Payload::Json(serde_json::from_str(&body)?))
        } else {
            Ok(Payload::Text(body))
        }
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<Payload, ApiError> {
        self.send(self.builder(Method::GET, path, timeout)).await
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Payload, ApiError> {
        self.send(self.builder(Method::POST, path, self.timeout).json(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<Payload, ApiError> {
        self.send(self.builder(Method::DELETE, path, self.timeout))
            .await
    }
}

/// Builds the error for a non-2xx response, preferring the server's own
/// `error` or `message` field.
pub(crate) fn http_error(status: StatusCode, body: &str) -> ApiError {
    let from_body = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["error", "message"]
            .iter()
            .find_map(|key| value.get(key)?.as_str().map(str::to_string))
    });

    let message = from_body.unwrap_or_else(|| {
        let detail = match body.trim() {
            "" => status.canonical_reason().unwrap_or_default(),
            text => text,
        };
        format!("HTTP {}: {}", status.as_u16(), detail)
    });

    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

impl QuoteBackend for ApiClient {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get(HEALTH_PATH, self.health_timeout).await?.decode()
    }

    async fn analyze_pdf(&self, upload: AnalysisUpload) -> Result<Value, ApiError> {
        log_debug!(
            "Uploading {} ({} bytes) to {ANALYZE_PDF_PATH}",
            upload.file_name,
            upload.bytes.len()
        );

        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/pdf")?;
        let form = Form::new()
            .part("file", file)
            .text("analysisType", upload.analysis_type)
            .text("language", upload.language);

        self.send(
            self.builder(Method::POST, ANALYZE_PDF_PATH, self.timeout)
                .multipart(form),
        )
        .await?
        .into_json()
    }

    async fn analysis_status(&self, analysis_id: &str) -> Result<Value, ApiError> {
        self.get(&format!("{ANALYSIS_STATUS_PATH}/{analysis_id}"), self.timeout)
            .await?
            .into_json()
    }

    async fn cancel_analysis(&self, analysis_id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("{ANALYSIS_PATH}/{analysis_id}"))
            .await?
            .into_json()
    }

    async fn calculate_heating(&self, building: &BuildingRecord) -> Result<HeatingDemand, ApiError> {
        self.post_json(HEATING_CALCULATE_PATH, building)
            .await?
            .decode()
    }

    async fn heating_service_health(&self) -> Result<Value, ApiError> {
        self.get(HEATING_HEALTH_PATH, self.health_timeout)
            .await?
            .into_json()
    }

    async fn send_email(&self, request: &EmailRequest) -> Result<EmailResponse, ApiError> {
        self.post_json(EMAIL_PATH, request).await?.decode()
    }

    async fn generate_offer_document(
        &self,
        request: &OfferDocumentRequest,
    ) -> Result<OfferDocumentResponse, ApiError> {
        self.post_json(OFFER_DOCUMENT_PATH, request).await?.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_wins() {
        let err = http_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status":"error","error":"Dozwolone są tylko pliki PDF"}"#,
        );
        assert_eq!(err.to_string(), "Dozwolone są tylko pliki PDF");
        assert_eq!(err.status(), Some(500));

        let err = http_error(StatusCode::BAD_REQUEST, r#"{"message":"Brak pliku"}"#);
        assert_eq!(err.to_string(), "Brak pliku");
    }

    #[test]
    fn plain_bodies_fall_back_to_status_line() {
        assert_eq!(
            http_error(StatusCode::BAD_GATEWAY, "").to_string(),
            "HTTP 502: Bad Gateway"
        );
        assert_eq!(
            http_error(StatusCode::NOT_FOUND, "no such route").to_string(),
            "HTTP 404: no such route"
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let settings = ClientSettings {
            base_url: "https://wycena.example/".into(),
            ..ClientSettings::default()
        };
        let client = ApiClient::new(&settings).unwrap();
        assert_eq!(client.base_url(), "https://wycena.example");
        assert_eq!(client.url(HEALTH_PATH), "https://wycena.example/api/health");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let settings = ClientSettings {
            base_url: "http://127.0.0.1:9".into(),
            health_timeout_secs: 2,
            ..ClientSettings::default()
        };
        let client = ApiClient::new(&settings).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_) | ApiError::Timeout));
    }
}
