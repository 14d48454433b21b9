//! Per-field validation for the four calculator forms.
//!
//! A field fails closed: a required field that is missing or blank is
//! invalid before any format or range rule runs, and format rules only
//! apply to values that are present. Results are plain values; nothing in
//! this module returns `Err`.

pub mod patterns;

use serde::Serialize;

use crate::forms::{FieldValue, FormData, FormId};
use crate::log_debug;

const ENABLE_LOGS: bool = true;

pub const REQUIRED_MESSAGE: &str = "To pole jest wymagane";
pub const GENERIC_FORMAT_MESSAGE: &str = "Niepoprawny format danych";

/// Inclusive bounds for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub message: &'static str,
}

impl Range {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const HEATED_AREA_RANGE: Range = Range {
    min: 10.0,
    max: 1000.0,
    message: "Powierzchnia musi być między 10 a 1000 m²",
};
pub const KNOWN_POWER_RANGE: Range = Range {
    min: 1.0,
    max: 50.0,
    message: "Moc musi być między 1 a 50 kW",
};
pub const FLOORS_RANGE: Range = Range {
    min: 1.0,
    max: 5.0,
    message: "Liczba kondygnacji musi być między 1 a 5",
};
pub const ANNUAL_DEMAND_RANGE: Range = Range {
    min: 1000.0,
    max: 100_000.0,
    message: "Zapotrzebowanie roczne musi być między 1000 a 100000 kWh",
};
pub const EU_INDEX_RANGE: Range = Range {
    min: 10.0,
    max: 500.0,
    message: "Wskaźnik EU musi być między 10 a 500 kWh/m²·rok",
};
pub const AUDIT_AREA_RANGE: Range = Range {
    min: 50.0,
    max: 1000.0,
    message: "Powierzchnia budynku musi być między 50 a 1000 m²",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Email,
    Phone,
    PostalCode,
    Power,
    Area,
    Decimal,
}

impl Pattern {
    fn for_field(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Pattern::Email),
            "phone" => Some(Pattern::Phone),
            "postal_code" => Some(Pattern::PostalCode),
            "known_power" | "manual_power" | "power" => Some(Pattern::Power),
            "heated_area" | "audit_area" | "project_area" | "area" => Some(Pattern::Area),
            "eu_index" | "project_eu" | "eu" | "annual_demand" => Some(Pattern::Decimal),
            _ => None,
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Email => patterns::is_email(value),
            Pattern::Phone => patterns::is_phone(value),
            Pattern::PostalCode => patterns::is_postal_code(value),
            Pattern::Power | Pattern::Area | Pattern::Decimal => patterns::is_decimal(value),
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Pattern::Email => "Wprowadź poprawny adres email",
            Pattern::Phone => "Wprowadź poprawny numer telefonu",
            Pattern::PostalCode => "Wprowadź kod pocztowy w formacie XX-XXX",
            Pattern::Power => "Wprowadź poprawną wartość mocy (liczba)",
            Pattern::Area => "Wprowadź poprawną powierzchnię (liczba)",
            Pattern::Decimal => GENERIC_FORMAT_MESSAGE,
        }
    }
}

fn range_for_field(name: &str) -> Option<Range> {
    match name {
        "heated_area" | "project_area" => Some(HEATED_AREA_RANGE),
        "eu_index" | "project_eu" | "eu" => Some(EU_INDEX_RANGE),
        "known_power" | "manual_power" => Some(KNOWN_POWER_RANGE),
        "floors" => Some(FLOORS_RANGE),
        "annual_demand" => Some(ANNUAL_DEMAND_RANGE),
        "audit_area" => Some(AUDIT_AREA_RANGE),
        _ => None,
    }
}

pub fn required_fields(form: FormId) -> &'static [&'static str] {
    match form {
        FormId::Mode1 => &["postal_code", "building_type", "heated_area"],
        FormId::Mode2 => &["postal_code", "building_type", "heat_pump_purpose"],
        FormId::Mode3 => &["postal_code", "current_heating", "heated_area"],
        FormId::Mode4 => &["postal_code", "known_power", "heat_pump_purpose"],
    }
}

pub fn is_required(name: &str, form: FormId) -> bool {
    required_fields(form).contains(&name)
}

/// Outcome for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn fail(message: &str) -> Self {
        Self {
            valid: false,
            error: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormValidation {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl FormValidation {
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }
}

pub fn validate_field(name: &str, value: Option<&FieldValue>, form: FormId) -> FieldCheck {
    let present = value.filter(|value| !value.is_blank());

    let Some(value) = present else {
        return if is_required(name, form) {
            FieldCheck::fail(REQUIRED_MESSAGE)
        } else {
            FieldCheck::ok()
        };
    };

    let text = value.as_text();

    if let Some(pattern) = Pattern::for_field(name) {
        if !pattern.matches(&text) {
            return FieldCheck::fail(pattern.message());
        }
    }

    if let Some(range) = range_for_field(name) {
        match text.parse::<f64>() {
            Ok(number) if range.contains(number) => {}
            Ok(_) => return FieldCheck::fail(range.message),
            Err(_) => return FieldCheck::fail(GENERIC_FORMAT_MESSAGE),
        }
    }

    FieldCheck::ok()
}

/// Checks every required field of `form` plus every field that is present.
pub fn validate_form(form: FormId, data: &FormData) -> FormValidation {
    let mut errors = Vec::new();

    for name in required_fields(form) {
        if data.get(name).is_none() {
            errors.push(FieldError {
                field: (*name).to_string(),
                message: REQUIRED_MESSAGE.to_string(),
            });
        }
    }

    for (name, value) in data.iter() {
        let check = validate_field(name, Some(value), form);
        if let Some(message) = check.error {
            errors.push(FieldError {
                field: name.clone(),
                message,
            });
        }
    }

    log_debug!("Form validation completed for {form}: {} errors", errors.len());

    FormValidation {
        valid: errors.is_empty(),
        errors,
    }
}
