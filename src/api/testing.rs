//! In-process backend for tests. Built for the crate's own unit tests and,
//! with the `testing` feature, for the integration tests.

use std::cell::{Cell, RefCell};

use serde_json::{json, Value};

use super::{
    AnalysisUpload, ApiError, BuildingRecord, EmailRequest, EmailResponse, HealthStatus,
    HeatingDemand, OfferDocumentRequest, OfferDocumentResponse, QuoteBackend,
};

/// kW per m² the fake full calculator answers with when `heating` is unset.
pub const FAKE_KW_PER_M2: f64 = 0.06;

/// Answers from canned values, records what it was sent and counts every call.
pub struct FakeBackend {
    pub analyzer_available: bool,
    /// `None` fails the upload with HTTP 500.
    pub analysis_response: RefCell<Option<Value>>,
    /// `None` answers `area × FAKE_KW_PER_M2`.
    pub heating: Option<HeatingDemand>,
    pub email_response: EmailResponse,
    /// `None` renders the requested kit into a small page.
    pub document_response: Option<OfferDocumentResponse>,
    pub requests: Cell<u32>,
    pub health_calls: Cell<u32>,
    pub uploads: RefCell<Vec<AnalysisUpload>>,
    pub buildings: RefCell<Vec<BuildingRecord>>,
    pub emails: RefCell<Vec<EmailRequest>>,
    pub documents: RefCell<Vec<OfferDocumentRequest>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            analyzer_available: true,
            analysis_response: RefCell::new(Some(json!({
                "status": "success",
                "data": {
                    "analysis": {
                        "found_data": {
                            "powierzchnia_uzytkowa": 142.0,
                            "wskaznik_eu": 65.0,
                            "lokalizacja": "Wrocław"
                        },
                        "analysis_summary": "Projekt domu parterowego",
                        "confidence_level": 0.9,
                        "data_quality": "good"
                    },
                    "heating_calculation": { "calculated_power": 10.3, "method": "zordon_formula" }
                }
            }))),
            heating: None,
            email_response: EmailResponse {
                success: true,
                message: Some("Email został wysłany pomyślnie".into()),
                message_id: Some("m-1".into()),
                ..EmailResponse::default()
            },
            document_response: None,
            requests: Cell::new(0),
            health_calls: Cell::new(0),
            uploads: RefCell::new(Vec::new()),
            buildings: RefCell::new(Vec::new()),
            emails: RefCell::new(Vec::new()),
            documents: RefCell::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    fn hit(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

impl QuoteBackend for FakeBackend {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.hit();
        self.health_calls.set(self.health_calls.get() + 1);
        Ok(HealthStatus {
            status: Some("healthy".into()),
            pdf_analyzer: Some(self.analyzer_available),
            ..HealthStatus::default()
        })
    }

    async fn analyze_pdf(&self, upload: AnalysisUpload) -> Result<Value, ApiError> {
        self.hit();
        self.uploads.borrow_mut().push(upload);
        self.analysis_response.borrow().clone().ok_or(ApiError::Http {
            status: 500,
            message: "Błąd analizy PDF".into(),
        })
    }

    async fn analysis_status(&self, analysis_id: &str) -> Result<Value, ApiError> {
        self.hit();
        Ok(json!({ "analysis_id": analysis_id, "status": "completed", "progress": 100 }))
    }

    async fn cancel_analysis(&self, analysis_id: &str) -> Result<Value, ApiError> {
        self.hit();
        Err(ApiError::Http {
            status: 404,
            message: format!("Analysis {analysis_id} not found"),
        })
    }

    async fn calculate_heating(&self, building: &BuildingRecord) -> Result<HeatingDemand, ApiError> {
        self.hit();
        self.buildings.borrow_mut().push(building.clone());
        Ok(self.heating.clone().unwrap_or_else(|| HeatingDemand {
            status: Some("success".into()),
            calculated_power: Some(building.powierzchnia * FAKE_KW_PER_M2),
            annual_demand: Some(building.powierzchnia * 110.0),
            eu_factor: Some(110.0),
            error: None,
        }))
    }

    async fn heating_service_health(&self) -> Result<Value, ApiError> {
        self.hit();
        Ok(json!({ "status": "healthy" }))
    }

    async fn send_email(&self, request: &EmailRequest) -> Result<EmailResponse, ApiError> {
        self.hit();
        self.emails.borrow_mut().push(request.clone());
        Ok(self.email_response.clone())
    }

    async fn generate_offer_document(
        &self,
        request: &OfferDocumentRequest,
    ) -> Result<OfferDocumentResponse, ApiError> {
        self.hit();
        self.documents.borrow_mut().push(request.clone());
        Ok(self.document_response.clone().unwrap_or_else(|| OfferDocumentResponse {
            success: true,
            html_content: Some(format!("<html><body>{}</body></html>", request.pump_data["kit"])),
            ..OfferDocumentResponse::default()
        }))
    }
}
