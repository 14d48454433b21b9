use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::router::{Route, UnknownRoute};

/// The four calculator forms, one per mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FormId {
    Mode1,
    Mode2,
    Mode3,
    Mode4,
}

impl FormId {
    pub const ALL: [FormId; 4] = [FormId::Mode1, FormId::Mode2, FormId::Mode3, FormId::Mode4];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormId::Mode1 => "mode1",
            FormId::Mode2 => "mode2",
            FormId::Mode3 => "mode3",
            FormId::Mode4 => "mode4",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            FormId::Mode1 => Route::Mode1,
            FormId::Mode2 => Route::Mode2,
            FormId::Mode3 => Route::Mode3,
            FormId::Mode4 => Route::Mode4,
        }
    }

    pub fn from_route(route: Route) -> Option<Self> {
        match route {
            Route::Mode1 => Some(FormId::Mode1),
            Route::Mode2 => Some(FormId::Mode2),
            Route::Mode3 => Some(FormId::Mode3),
            Route::Mode4 => Some(FormId::Mode4),
            Route::Welcome | Route::Results => None,
        }
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormId {
    type Err = UnknownRoute;

    /// Accepts route names and the element ids the forms were rendered under.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "heatCalcFormFull" => return Ok(FormId::Mode1),
            "heatCalcMode2" => return Ok(FormId::Mode2),
            "form-mode3" | "heatCalcMode3" => return Ok(FormId::Mode3),
            "form-mode4" => return Ok(FormId::Mode4),
            _ => {}
        }

        value
            .parse::<Route>()
            .ok()
            .and_then(FormId::from_route)
            .ok_or_else(|| UnknownRoute(value.to_string()))
    }
}

/// A single input: checkboxes carry a flag, everything else text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Flag(_) => false,
            FieldValue::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Flag(flag) => flag.to_string(),
            FieldValue::Text(text) => text.trim().to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Field name to value, as collected from one form on submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FormData {
    fields: BTreeMap<String, FieldValue>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from `(name, value)` pairs, skipping empty text inputs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut data = Self::new();
        for (name, value) in pairs {
            data.insert(name, value);
        }
        data
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let value = value.into();
        if !matches!(&value, FieldValue::Text(text) if text.is_empty()) {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Trimmed, non-empty text of a field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|value| !value.is_blank())
            .map(FieldValue::as_text)
    }

    /// First field of `names` that carries text.
    pub fn text_any(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.text(name))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.text(name)
            .and_then(|text| text.replace(',', ".").parse::<f64>().ok())
            .filter(|number| number.is_finite())
    }

    pub fn number_any(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| self.number(name))
    }

    /// Checkbox state; text inputs count as set when they read `true`, `on` or `1`.
    pub fn flag(&self, name: &str) -> bool {
        match self.fields.get(name) {
            Some(FieldValue::Flag(flag)) => *flag,
            Some(FieldValue::Text(text)) => {
                let text = text.trim();
                text == "1" || text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("on")
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_ids_accept_route_names_and_element_ids() {
        assert_eq!("tryb2".parse::<FormId>().unwrap(), FormId::Mode2);
        assert_eq!("heatCalcFormFull".parse::<FormId>().unwrap(), FormId::Mode1);
        assert_eq!("form-mode4".parse::<FormId>().unwrap(), FormId::Mode4);
        assert!("results".parse::<FormId>().is_err());
        assert!("welcome".parse::<FormId>().is_err());
    }

    #[test]
    fn empty_inputs_are_not_collected() {
        let data = FormData::from_pairs([("postal_code", ""), ("heated_area", "120")]);
        assert_eq!(data.len(), 1);
        assert!(data.get("postal_code").is_none());
    }

    #[test]
    fn typed_accessors() {
        let mut data = FormData::from_pairs([("heated_area", " 120,5 "), ("basement", "true")]);
        data.insert("cwu_needed", true);

        assert_eq!(data.number("heated_area"), Some(120.5));
        assert_eq!(data.number_any(&["audit_area", "heated_area"]), Some(120.5));
        assert!(data.flag("basement"));
        assert!(data.flag("cwu_needed"));
        assert!(!data.flag("missing"));
        assert_eq!(data.number("basement"), None);
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut data = FormData::new();
        data.insert("known_power", "8.5");
        data.insert("basement", false);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json, serde_json::json!({ "known_power": "8.5", "basement": false }));

        let back: FormData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }
}
