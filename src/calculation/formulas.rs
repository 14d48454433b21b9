//! Pure heat-demand formulas. None of these perform I/O; every divisor is a
//! constant.

use serde::{Deserialize, Serialize};

/// Heating hours per year used by the project-data formula.
pub const PROJECT_HOURS: f64 = 1800.0;
pub const PROJECT_PEAK_FACTOR: f64 = 2.0;
/// Heating hours per year used by the energy-audit formula.
pub const AUDIT_HOURS: f64 = 2000.0;
pub const AUDIT_SAFETY_FACTOR: f64 = 1.5;
/// Coefficient (W/m²) for construction years missing from the table.
pub const DEFAULT_AGE_COEFFICIENT: f64 = 150.0;
/// Hot-water demand per resident, kW.
pub const CWU_KW_PER_RESIDENT: f64 = 0.5;

/// Rounds half up to one decimal place: 11.25 becomes 11.3.
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Mode 2: `annual = area × EU`, `power = annual / 1800 × 2`.
pub fn project_power(area: f64, eu_index: f64) -> (f64, f64) {
    let annual_demand = area * eu_index;
    (annual_demand, round1(annual_demand / PROJECT_HOURS * PROJECT_PEAK_FACTOR))
}

/// Mode 3: `power = annual / 2000 × 1.5`.
pub fn audit_power(annual_demand: f64) -> f64 {
    round1(annual_demand / AUDIT_HOURS * AUDIT_SAFETY_FACTOR)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsulationLevel {
    Excellent,
    Good,
    Average,
    Poor,
}

impl InsulationLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "average" => Some(Self::Average),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Excellent => 0.7,
            Self::Good => 0.85,
            Self::Average => 1.0,
            Self::Poor => 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UsagePattern {
    Economical,
    Comfortable,
    Luxury,
}

impl UsagePattern {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "economical" => Some(Self::Economical),
            "comfortable" => Some(Self::Comfortable),
            "luxury" => Some(Self::Luxury),
            _ => None,
        }
    }

    fn demand_multiplier(pattern: Option<Self>) -> f64 {
        match pattern {
            Some(Self::Economical) => 0.8,
            Some(Self::Comfortable) => 1.2,
            Some(Self::Luxury) => 1.5,
            None => 1.0,
        }
    }
}

/// Base coefficient in W/m² for a construction-year bracket.
pub fn age_coefficient(building_year: u32) -> f64 {
    match building_year {
        2025 => 30.0,
        2021 => 40.0,
        2011 => 60.0,
        2000 => 80.0,
        1990 => 100.0,
        1980 => 120.0,
        1970 => 140.0,
        1960 => 160.0,
        1950 => 180.0,
        1940 => 200.0,
        1939 => 220.0,
        1914 => 240.0,
        _ => DEFAULT_AGE_COEFFICIENT,
    }
}

/// Year coefficient adjusted by insulation; unknown insulation counts as average.
pub fn heat_demand_coefficient(building_year: u32, insulation: Option<InsulationLevel>) -> f64 {
    age_coefficient(building_year) * insulation.map_or(1.0, |level| level.multiplier())
}

/// Hot-water demand in kW: `residents × 0.5 × pattern multiplier`.
pub fn cwu_demand(residents: u32, pattern: Option<UsagePattern>) -> f64 {
    f64::from(residents) * CWU_KW_PER_RESIDENT * UsagePattern::demand_multiplier(pattern)
}

/// Building-age variant of mode 3, in kW: `area × coefficient / 1000 + cwu`.
pub fn building_age_power(area: f64, coefficient: f64, cwu_kw: f64) -> f64 {
    round1(area * coefficient / 1000.0 + cwu_kw)
}

pub fn source_description(source: &str) -> &'static str {
    match source {
        "audit" => "Audyt energetyczny",
        "project" => "Projekt techniczny",
        "calculation" => "Własne obliczenia",
        "installer" => "Rekomendacja instalatora",
        "manufacturer" => "Dane producenta",
        "other" => "Inne źródło",
        _ => "Nieznane źródło",
    }
}
