//! Recommended heat-pump power per mode.
//!
//! Modes 2 to 4 are pure formulas over the submitted form. Mode 1 hands a
//! prepared building record to a [`FullCalculator`].

pub mod formulas;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiError, BuildingRecord, QuoteBackend};
use crate::forms::{FormData, FormId};
use crate::validation::KNOWN_POWER_RANGE;
use crate::{log_debug, log_info};

use formulas::{
    audit_power, building_age_power, cwu_demand, heat_demand_coefficient, project_power,
    source_description, InsulationLevel, UsagePattern, AUDIT_HOURS, AUDIT_SAFETY_FACTOR,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    /// Remote full calculator (mode 1).
    FullCalculator,
    Project,
    Audit,
    BuildingAge,
    Manual,
}

impl CalculationMethod {
    pub fn description(&self) -> &'static str {
        match self {
            CalculationMethod::FullCalculator => "Pełny kalkulator",
            CalculationMethod::Project => "Obliczenie na podstawie projektu",
            CalculationMethod::Audit => "Obliczenie na podstawie audytu",
            CalculationMethod::BuildingAge => "Obliczenie na podstawie wieku budynku",
            CalculationMethod::Manual => "Moc podana ręcznie",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// kW, one decimal.
    pub calculated_power: f64,
    pub method: CalculationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_demand: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eu_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// The arithmetic with the user's numbers filled in.
    pub calculation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CalculationResult {
    fn new(method: CalculationMethod, calculated_power: f64, calculation: String) -> Self {
        Self {
            calculated_power,
            method,
            annual_demand: None,
            area: None,
            eu_index: None,
            formula: None,
            calculation,
            note: None,
            source: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("missing value for '{0}'")]
    MissingInput(&'static str),
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("heating calculation failed: {0}")]
    Remote(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Whatever produces the mode 1 result.
#[allow(async_fn_in_trait)]
pub trait FullCalculator {
    async fn calculate_full(
        &self,
        building: &BuildingRecord,
    ) -> Result<CalculationResult, CalculationError>;
}

impl<B: QuoteBackend> FullCalculator for B {
    async fn calculate_full(
        &self,
        building: &BuildingRecord,
    ) -> Result<CalculationResult, CalculationError> {
        let demand = self.calculate_heating(building).await?;
        if !demand.is_success() {
            return Err(CalculationError::Remote(
                demand.error.unwrap_or_else(|| "brak wyniku".into()),
            ));
        }
        let power = demand
            .calculated_power
            .ok_or_else(|| CalculationError::Remote("brak obliczonej mocy".into()))?;
        if !power.is_finite() || power <= 0.0 {
            return Err(CalculationError::Remote(format!("niepoprawna moc: {power}")));
        }

        let mut result = CalculationResult::new(
            CalculationMethod::FullCalculator,
            formulas::round1(power),
            format!("cieplo.app: {power} kW"),
        );
        result.annual_demand = demand.annual_demand;
        result.area = Some(building.powierzchnia);
        result.eu_index = demand.eu_factor;
        Ok(result)
    }
}

/// Fills the building record the full calculator expects, defaulting
/// every field the form left empty.
pub fn prepare_calculation_data(form: &FormData) -> BuildingRecord {
    BuildingRecord {
        powierzchnia: form.number("heated_area").unwrap_or(0.0),
        postal_code: form.text("postal_code").unwrap_or_else(|| "00-000".into()),
        building_type: form.text("building_type").unwrap_or_else(|| "dom".into()),
        insulation: form.text("insulation").unwrap_or_else(|| "standard".into()),
        heating_temp: form.number("heating_temp").unwrap_or(55.0),
        floors: form
            .number("floors")
            .map(|floors| floors.trunc() as u32)
            .filter(|floors| *floors > 0)
            .unwrap_or(1),
        basement: form.flag("basement"),
        roof: form.text("roof_type").unwrap_or_else(|| "flat".into()),
        windows: form.text("windows").unwrap_or_else(|| "standard".into()),
        ventilation: form.text("ventilation").unwrap_or_else(|| "natural".into()),
    }
}

fn required(form: &FormData, names: &[&str], label: &'static str) -> Result<f64, CalculationError> {
    form.number_any(names)
        .filter(|value| *value > 0.0)
        .ok_or(CalculationError::MissingInput(label))
}

/// Mode 2, project data.
pub fn calculate_project(area: f64, eu_index: f64) -> CalculationResult {
    let (annual_demand, power) = project_power(area, eu_index);
    let mut result = CalculationResult::new(
        CalculationMethod::Project,
        power,
        format!("({area} × {eu_index}) / 1800 × 2 = {power:.1} kW"),
    );
    result.annual_demand = Some(annual_demand);
    result.area = Some(area);
    result.eu_index = Some(eu_index);
    result.formula = Some("(Powierzchnia × EU) / 1800 × 2".into());
    result
}

/// Mode 3, energy audit.
pub fn calculate_audit(annual_demand: f64, area: Option<f64>) -> CalculationResult {
    let power = audit_power(annual_demand);
    let mut result = CalculationResult::new(
        CalculationMethod::Audit,
        power,
        format!("{annual_demand} / {AUDIT_HOURS} × {AUDIT_SAFETY_FACTOR} = {power:.1} kW"),
    );
    result.annual_demand = Some(annual_demand);
    result.area = area;
    result.eu_index = area
        .filter(|area| *area > 0.0)
        .map(|area| (annual_demand / area).round());
    result.formula = Some("Zapotrzebowanie roczne / 2000 × 1.5".into());
    result
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingAgeInput {
    pub area: f64,
    pub building_year: u32,
    pub insulation: Option<InsulationLevel>,
    /// Residents and usage, when hot water is part of the demand.
    pub cwu: Option<(u32, Option<UsagePattern>)>,
}

/// Mode 3 when no audit figure exists: coefficient by construction year.
pub fn calculate_building_age(input: &BuildingAgeInput) -> CalculationResult {
    let coefficient = heat_demand_coefficient(input.building_year, input.insulation);
    let cwu_kw = input
        .cwu
        .map_or(0.0, |(residents, pattern)| cwu_demand(residents, pattern));
    let power = building_age_power(input.area, coefficient, cwu_kw);

    let mut result = CalculationResult::new(
        CalculationMethod::BuildingAge,
        power,
        format!(
            "{} m² × {coefficient} W/m² / 1000 + {cwu_kw} kW CWU = {power:.1} kW",
            input.area
        ),
    );
    result.area = Some(input.area);
    result.formula = Some("Powierzchnia × wskaźnik / 1000 + CWU".into());
    result
}

/// Mode 4: the supplied power, verbatim.
pub fn calculate_known_power(
    power: f64,
    source: Option<&str>,
) -> Result<CalculationResult, CalculationError> {
    if !KNOWN_POWER_RANGE.contains(power) {
        return Err(CalculationError::OutOfRange {
            field: "known_power",
            value: power,
            min: KNOWN_POWER_RANGE.min,
            max: KNOWN_POWER_RANGE.max,
        });
    }

    let mut result =
        CalculationResult::new(CalculationMethod::Manual, power, format!("{power} kW"));
    result.note = Some("Moc podana bezpośrednio przez użytkownika".into());
    result.source = source.map(|source| source_description(source).to_string());
    Ok(result)
}

/// Picks the formula for `form` and runs it over validated form data.
pub async fn calculate<C: FullCalculator>(
    form: FormId,
    data: &FormData,
    full: &C,
) -> Result<CalculationResult, CalculationError> {
    log_debug!("Calculating {form}");

    let result = match form {
        FormId::Mode1 => {
            let building = prepare_calculation_data(data);
            if building.powierzchnia <= 0.0 {
                return Err(CalculationError::MissingInput("heated_area"));
            }
            full.calculate_full(&building).await?
        }
        FormId::Mode2 => {
            let area = required(data, &["heated_area", "project_area"], "heated_area")?;
            let eu = required(data, &["eu_index", "project_eu", "eu"], "eu_index")?;
            calculate_project(area, eu)
        }
        FormId::Mode3 => {
            let area = data.number_any(&["audit_area", "heated_area"]);
            match data.number("annual_demand").filter(|value| *value > 0.0) {
                Some(annual_demand) => calculate_audit(annual_demand, area),
                None => {
                    let year = data
                        .number("building_year")
                        .ok_or(CalculationError::MissingInput("annual_demand"))?;
                    let area = area
                        .filter(|area| *area > 0.0)
                        .ok_or(CalculationError::MissingInput("heated_area"))?;
                    let cwu = data.flag("cwu_needed").then(|| {
                        let residents = data.number("residents").unwrap_or(1.0).max(0.0) as u32;
                        let pattern = data
                            .text("usage_pattern")
                            .and_then(|pattern| UsagePattern::parse(&pattern));
                        (residents, pattern)
                    });
                    calculate_building_age(&BuildingAgeInput {
                        area,
                        building_year: year as u32,
                        insulation: data
                            .text_any(&["insulation_level", "insulation"])
                            .and_then(|level| InsulationLevel::parse(&level)),
                        cwu,
                    })
                }
            }
        }
        FormId::Mode4 => {
            let power = data
                .number_any(&["known_power", "manual_power"])
                .ok_or(CalculationError::MissingInput("known_power"))?;
            let source = data.text("power_source");
            calculate_known_power(power, source.as_deref())?
        }
    };

    log_info!(
        "{}: {} kW",
        result.method.description(),
        result.calculated_power
    );
    Ok(result)
}
