//! The quote record every flow reads from and writes into.
//!
//! Field names are English on the Rust side; the serialized keys keep the
//! names the site stored under `ZORDON_STATE`, so old snapshots load as-is.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::router::Route;

pub const STATE_VERSION: &str = "2025-07-26";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuoteState {
    #[serde(rename = "currentMode")]
    pub current_mode: Option<Route>,

    #[serde(rename = "powierzchnia")]
    pub heated_area: Option<f64>,
    /// EU index, kWh/m²·year.
    #[serde(rename = "eu")]
    pub eu_index: Option<f64>,
    #[serde(rename = "kondygnacje")]
    pub floors: u32,
    #[serde(rename = "piwnica")]
    pub basement: bool,
    #[serde(rename = "dach")]
    pub roof: String,

    #[serde(rename = "mocSzacowana")]
    pub estimated_power: Option<f64>,
    #[serde(rename = "mocObliczona")]
    pub calculated_power: Option<f64>,

    pub kit: Option<String>,
    pub buffer: Option<String>,
    pub cwu: Option<String>,

    pub price: Option<f64>,
    #[serde(rename = "priceNet")]
    pub price_net: Option<f64>,
    #[serde(rename = "priceGross")]
    pub price_gross: Option<f64>,

    #[serde(rename = "pdfReady")]
    pub pdf_ready: bool,
    #[serde(rename = "calculationComplete")]
    pub calculation_complete: bool,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,

    pub timestamp: String,
    pub version: String,

    /// Keys written by flows that the record does not model (`aiResults`, `emailSent`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for QuoteState {
    fn default() -> Self {
        Self {
            current_mode: None,
            heated_area: None,
            eu_index: None,
            floors: 1,
            basement: false,
            roof: "flat".into(),
            estimated_power: None,
            calculated_power: None,
            kit: None,
            buffer: None,
            cwu: None,
            price: None,
            price_net: None,
            price_gross: None,
            pdf_ready: false,
            calculation_complete: false,
            email: None,
            phone: None,
            name: None,
            timestamp: Utc::now().to_rfc3339(),
            version: STATE_VERSION.into(),
            extra: Map::new(),
        }
    }
}

/// Flat snapshot handed to the offer generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub struct PdfSummary {
    pub moc: Option<f64>,
    pub kit: Option<String>,
    pub buffer: Option<String>,
    pub cwu: Option<String>,
    pub price: Option<f64>,
    pub powierzchnia: Option<f64>,
    pub email: Option<String>,
    pub timestamp: String,
}

impl QuoteState {
    /// Default record with a fixed timestamp.
    pub fn defaults_at(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            ..Self::default()
        }
    }

    pub fn power(&self) -> Option<f64> {
        self.estimated_power.or(self.calculated_power)
    }

    pub fn is_calculation_complete(&self) -> bool {
        self.estimated_power.is_some()
            && self.kit.is_some()
            && self.price.is_some()
            && self.current_mode.is_some()
    }

    pub fn can_generate_pdf(&self) -> bool {
        let has_contact = self.email.as_deref().is_some_and(|s| !s.is_empty())
            || self.phone.as_deref().is_some_and(|s| !s.is_empty());
        self.is_calculation_complete() && has_contact
    }

    pub fn pdf_summary(&self) -> PdfSummary {
        PdfSummary {
            moc: self.estimated_power,
            kit: self.kit.clone(),
            buffer: self.buffer.clone(),
            cwu: self.cwu.clone(),
            price: self.price,
            powierzchnia: self.heated_area,
            email: self.email.clone(),
            timestamp: self.timestamp.clone(),
        }
    }

    /// `calculationComplete` may only be set once power, kit and price exist.
    pub fn completion_is_consistent(&self) -> bool {
        !self.calculation_complete
            || (self.power().is_some() && self.kit.is_some() && self.price.is_some())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(map.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_storage_key_names() {
        let state = QuoteState::defaults_at("2025-07-26T00:00:00Z");
        let map = state.to_map();
        assert_eq!(map["kondygnacje"], json!(1));
        assert_eq!(map["dach"], json!("flat"));
        assert_eq!(map["mocSzacowana"], Value::Null);
        assert_eq!(map["version"], json!(STATE_VERSION));
        assert!(!map.contains_key("extra"));
    }

    #[test]
    fn unknown_keys_land_in_extra() {
        let mut map = QuoteState::default().to_map();
        map.insert("aiAnalysisCompleted".into(), json!(true));
        let state = QuoteState::from_map(&map).unwrap();
        assert_eq!(state.extra.get("aiAnalysisCompleted"), Some(&json!(true)));
        assert_eq!(QuoteState::from_map(&state.to_map()).unwrap(), state);
    }

    #[test]
    fn legacy_mode_names_are_accepted() {
        let mut map = QuoteState::default().to_map();
        map.insert("currentMode".into(), json!("tryb2"));
        let state = QuoteState::from_map(&map).unwrap();
        assert_eq!(state.current_mode, Some(Route::Mode2));
    }

    #[test]
    fn pdf_requires_contact_and_complete_calculation() {
        let mut state = QuoteState::default();
        assert!(!state.can_generate_pdf());

        state.current_mode = Some(Route::Mode4);
        state.estimated_power = Some(8.5);
        state.kit = Some("Panasonic Monoblock 9kW".into());
        state.price = Some(30_000.0);
        assert!(state.is_calculation_complete());
        assert!(!state.can_generate_pdf());

        state.phone = Some("+48 600 100 200".into());
        assert!(state.can_generate_pdf());
    }

    #[test]
    fn completion_flag_needs_power_kit_and_price() {
        let mut state = QuoteState::default();
        state.calculation_complete = true;
        assert!(!state.completion_is_consistent());

        state.calculated_power = Some(7.0);
        state.kit = Some("kit".into());
        state.price = Some(1.0);
        assert!(state.completion_is_consistent());
    }
}
