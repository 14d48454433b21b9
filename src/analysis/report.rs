//! Normalization of analyzer responses. The service answers in two shapes
//! (`{status, data: {...}}` or a flat body with `processing_status`); both are
//! folded into one [`AnalysisReport`].

use serde::Serialize;
use serde_json::{json, Map, Value};

pub const DEFAULT_FAILURE_MESSAGE: &str = "Nie udało się przeanalizować projektu";

/// Quote keys that only hold for the power they were priced at.
const STALE_QUOTE_KEYS: [&str; 6] = ["kit", "buffer", "cwu", "price", "priceNet", "priceGross"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub area: Option<f64>,
    pub eu_index: Option<f64>,
    pub location: Option<String>,
    pub calculated_power: Option<f64>,
    pub method: Option<String>,
    pub formula: Option<String>,
    pub summary: Option<String>,
    pub data_quality: Option<String>,
    /// Between 0 and 1 when the analyzer reports it.
    pub confidence: Option<f64>,
    /// The result body as received, kept for `aiResults`.
    pub data: Value,
}

impl AnalysisReport {
    /// Keys merged into the quote state after a successful analysis.
    ///
    /// Values the analyzer did not find are left out, so earlier input
    /// survives. A power other than `current_power` drops the kit and prices
    /// sized for the old one and reopens the calculation.
    pub fn state_fields(&self, current_power: Option<f64>) -> Value {
        let mut fields = Map::new();
        if let Some(area) = self.area {
            fields.insert("powierzchnia".into(), json!(area));
        }
        if let Some(eu) = self.eu_index {
            fields.insert("eu".into(), json!(eu));
        }
        if let Some(power) = self.calculated_power.filter(|power| Some(*power) != current_power) {
            fields.insert("mocSzacowana".into(), json!(power));
            for key in STALE_QUOTE_KEYS {
                fields.insert(key.into(), Value::Null);
            }
            fields.insert("calculationComplete".into(), json!(false));
            fields.insert("pdfReady".into(), json!(false));
        }
        fields.insert("aiAnalysisCompleted".into(), json!(true));
        fields.insert("aiResults".into(), self.data.clone());
        Value::Object(fields)
    }

    pub fn confidence_percent(&self) -> Option<u32> {
        self.confidence
            .map(|value| (value.clamp(0.0, 1.0) * 100.0).round() as u32)
    }
}

fn is_success(response: &Value) -> bool {
    ["status", "processing_status"]
        .iter()
        .any(|key| response.get(key).and_then(Value::as_str) == Some("success"))
}

fn text(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn number(value: &Value, pointer: &str) -> Option<f64> {
    let parsed: Option<f64> = match value.pointer(pointer)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    parsed.filter(|number| number.is_finite())
}

/// The human message carried by a failed response.
pub fn failure_message(response: &Value) -> String {
    ["/message", "/error_message", "/error", "/data/error_message"]
        .iter()
        .find_map(|pointer| text(response, pointer))
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())
}

/// Accepts the response when it reports success and carries either an
/// `analysis` or a `heating_calculation` block. Otherwise returns the
/// message to show.
pub fn normalize(response: &Value) -> Result<AnalysisReport, String> {
    if !is_success(response) {
        return Err(failure_message(response));
    }

    let data = match response.get("data") {
        Some(data) if data.is_object() => data,
        _ => response,
    };
    if data.get("analysis").is_none() && data.get("heating_calculation").is_none() {
        return Err(failure_message(response));
    }

    Ok(AnalysisReport {
        area: number(data, "/analysis/found_data/powierzchnia_uzytkowa"),
        eu_index: number(data, "/analysis/found_data/wskaznik_eu"),
        location: text(data, "/analysis/found_data/lokalizacja"),
        calculated_power: number(data, "/heating_calculation/calculated_power"),
        method: text(data, "/heating_calculation/method"),
        formula: text(data, "/heating_calculation/formula"),
        summary: text(data, "/analysis/analysis_summary"),
        data_quality: text(data, "/analysis/data_quality"),
        confidence: number(data, "/analysis/confidence_level")
            .or_else(|| number(data, "/confidence")),
        data: data.clone(),
    })
}
