//! Request and response bodies for the backend endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HEALTH_PATH: &str = "/api/health";
pub const ANALYZE_PDF_PATH: &str = "/api/analyze-pdf";
pub const ANALYSIS_STATUS_PATH: &str = "/api/analysis-status";
pub const ANALYSIS_PATH: &str = "/api/analysis";
pub const HEATING_CALCULATE_PATH: &str = "/api/cieplo/calculate";
pub const HEATING_HEALTH_PATH: &str = "/api/cieplo/health";
pub const EMAIL_PATH: &str = "/backend_php/email-proxy.php";
pub const OFFER_DOCUMENT_PATH: &str = "/backend_php/gen-pdf.php";

/// `/api/health`. Older servers report `pdf_analyzer`, newer ones
/// `pdf_analyzer_available`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pdf_analyzer: Option<bool>,
    #[serde(default)]
    pub pdf_analyzer_available: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HealthStatus {
    pub fn analyzer_available(&self) -> bool {
        self.pdf_analyzer.unwrap_or(false) || self.pdf_analyzer_available.unwrap_or(false)
    }
}

/// One project PDF queued for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub analysis_type: String,
    pub language: String,
}

/// Building record posted to the heating-demand service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingRecord {
    pub powierzchnia: f64,
    #[serde(rename = "kodPocztowy")]
    pub postal_code: String,
    #[serde(rename = "typBudynku")]
    pub building_type: String,
    #[serde(rename = "ocieplenie")]
    pub insulation: String,
    #[serde(rename = "tempOgrzewania")]
    pub heating_temp: f64,
    #[serde(rename = "kondygnacje")]
    pub floors: u32,
    #[serde(rename = "piwnica")]
    pub basement: bool,
    #[serde(rename = "dach")]
    pub roof: String,
    #[serde(rename = "okna")]
    pub windows: String,
    #[serde(rename = "wentylacja")]
    pub ventilation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeatingDemand {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "mocObliczona", default)]
    pub calculated_power: Option<f64>,
    #[serde(rename = "zapotrzebowanieRoczne", default)]
    pub annual_demand: Option<f64>,
    #[serde(rename = "wspolczynnikEU", default)]
    pub eu_factor: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HeatingDemand {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub to: String,
    /// Same address as `to`; older proxies read this key.
    pub email: String,
    pub subject: String,
    pub message: String,
    pub customer_name: String,
    pub pdf_data: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferDocumentRequest {
    pub building_data: Value,
    pub pump_data: Value,
    pub pricing: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferDocumentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn health_accepts_both_availability_keys() {
        let old: HealthStatus = serde_json::from_value(json!({ "pdf_analyzer": true })).unwrap();
        let new: HealthStatus = serde_json::from_value(json!({
            "status": "healthy",
            "pdf_analyzer_available": true,
            "groq_api_configured": false
        }))
        .unwrap();
        let down: HealthStatus = serde_json::from_value(json!({ "status": "healthy" })).unwrap();

        assert!(old.analyzer_available());
        assert!(new.analyzer_available());
        assert_eq!(new.extra.get("groq_api_configured"), Some(&json!(false)));
        assert!(!down.analyzer_available());
    }

    #[test]
    fn email_request_uses_camel_case_keys() {
        let request = EmailRequest {
            to: "jan@example.pl".into(),
            email: "jan@example.pl".into(),
            subject: "Oferta".into(),
            message: "<p>Oferta</p>".into(),
            customer_name: "Jan".into(),
            pdf_data: String::new(),
            language: "pl".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["customerName"], json!("Jan"));
        assert_eq!(value["pdfData"], json!(""));
    }

    #[test]
    fn heating_demand_maps_polish_keys() {
        let demand: HeatingDemand = serde_json::from_value(json!({
            "status": "success",
            "mocObliczona": 9.4,
            "zapotrzebowanieRoczne": 16500,
            "wspolczynnikEU": 85
        }))
        .unwrap();
        assert!(demand.is_success());
        assert_eq!(demand.calculated_power, Some(9.4));
        assert_eq!(demand.annual_demand, Some(16500.0));
    }
}
