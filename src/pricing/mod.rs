//! Component kit and price for a given heating power.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::calculation::formulas::UsagePattern;
use crate::forms::FormData;

pub const SPLIT_PRICE_PER_KW: f64 = 3000.0;
pub const MONOBLOCK_PRICE_PER_KW: f64 = 2800.0;
/// PLN per litre of hot-water tank.
pub const DHW_PRICE_PER_LITRE: f64 = 8.0;
/// PLN per litre of buffer tank.
pub const BUFFER_PRICE_PER_LITRE: f64 = 6.0;
pub const DEFAULT_DHW_LITRES: u32 = 300;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PumpType {
    Split,
    #[default]
    Monoblock,
}

impl PumpType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "split" => Some(PumpType::Split),
            "monoblock" | "monoblok" => Some(PumpType::Monoblock),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PumpType::Split => "Split",
            PumpType::Monoblock => "Monoblock",
        }
    }

    fn price_per_kw(&self) -> f64 {
        match self {
            PumpType::Split => SPLIT_PRICE_PER_KW,
            PumpType::Monoblock => MONOBLOCK_PRICE_PER_KW,
        }
    }

    fn features(&self) -> &'static [&'static str] {
        match self {
            PumpType::Split => &["Cicha praca", "Praca do -25°C", "Inteligentne sterowanie"],
            PumpType::Monoblock => &["Kompaktowa konstrukcja", "Łatwy montaż", "Bez ryzyka wycieku"],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HeatingType {
    Radiators,
    Underfloor,
    Mixed,
}

impl HeatingType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "radiators" | "grzejniki" => Some(HeatingType::Radiators),
            "underfloor" | "floor" | "podlogowe" => Some(HeatingType::Underfloor),
            "mixed" => Some(HeatingType::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KitOptions {
    pub pump_type: PumpType,
    pub heating_type: Option<HeatingType>,
    /// Residents and usage pattern when a hot-water tank is wanted.
    pub dhw: Option<(u32, Option<UsagePattern>)>,
    pub vat_rate: f64,
}

impl Default for KitOptions {
    fn default() -> Self {
        Self {
            pump_type: PumpType::default(),
            heating_type: None,
            dhw: None,
            vat_rate: 0.08,
        }
    }
}

impl KitOptions {
    /// Reads `pump_type`, `heating_type`, `cwu_needed`, `residents` and
    /// `usage_pattern` from a submitted form.
    pub fn from_form(form: &FormData, vat_rate: f64) -> Self {
        let dhw = form.flag("cwu_needed").then(|| {
            let residents = form.number("residents").unwrap_or(1.0).max(0.0) as u32;
            let pattern = form
                .text("usage_pattern")
                .and_then(|pattern| UsagePattern::parse(&pattern));
            (residents, pattern)
        });

        Self {
            pump_type: form
                .text("pump_type")
                .and_then(|value| PumpType::parse(&value))
                .unwrap_or_default(),
            heating_type: form
                .text("heating_type")
                .and_then(|value| HeatingType::parse(&value)),
            dhw,
            vat_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PumpRecommendation {
    pub model: String,
    pub power_kw: u32,
    pub price: f64,
    pub efficiency: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TankRecommendation {
    pub litres: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub name: String,
    pub price: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KitRecommendation {
    pub power_kw: f64,
    pub pump: PumpRecommendation,
    pub buffer_tank: TankRecommendation,
    pub dhw_tank: Option<TankRecommendation>,
    pub additional: Vec<Component>,
    pub net: f64,
    pub vat_rate: f64,
    pub gross: f64,
    pub total: f64,
}

impl KitRecommendation {
    pub fn kit_label(&self) -> String {
        self.pump.model.clone()
    }

    pub fn buffer_label(&self) -> String {
        format!("Bufor {} l", self.buffer_tank.litres)
    }

    pub fn cwu_label(&self) -> Option<String> {
        self.dhw_tank
            .map(|tank| format!("Zasobnik CWU {} l", tank.litres))
    }

    /// The state keys a recommendation fills in.
    pub fn state_fields(&self) -> Value {
        json!({
            "kit": self.kit_label(),
            "buffer": self.buffer_label(),
            "cwu": self.cwu_label(),
            "price": self.total,
            "priceNet": self.net,
            "priceGross": self.gross,
        })
    }
}

/// Whole units, rounded up. `as` saturates, so absurd powers clamp to `u32::MAX`.
fn whole_units(value: f64) -> u32 {
    value.max(0.0).ceil() as u32
}

pub fn recommend_pump(power_kw: f64, pump_type: PumpType) -> PumpRecommendation {
    let size = whole_units(power_kw);
    PumpRecommendation {
        model: format!("Panasonic {} {size}kW", pump_type.label()),
        power_kw: size,
        price: f64::from(size) * pump_type.price_per_kw(),
        efficiency: "A+++".into(),
        features: pump_type.features().iter().map(|f| f.to_string()).collect(),
    }
}

/// Tank size by resident count (capped at 4) and usage pattern.
pub fn recommend_dhw_tank(residents: u32, pattern: Option<UsagePattern>) -> TankRecommendation {
    let litres = match (pattern, residents.min(4)) {
        (Some(UsagePattern::Economical), 1) => 150,
        (Some(UsagePattern::Economical), 2) => 200,
        (Some(UsagePattern::Economical), 3) => 250,
        (Some(UsagePattern::Economical), 4) => 300,
        (Some(UsagePattern::Comfortable), 1) => 200,
        (Some(UsagePattern::Comfortable), 2) => 250,
        (Some(UsagePattern::Comfortable), 3) => 300,
        (Some(UsagePattern::Comfortable), 4) => 400,
        (Some(UsagePattern::Luxury), 1) => 250,
        (Some(UsagePattern::Luxury), 2) => 300,
        (Some(UsagePattern::Luxury), 3) => 400,
        (Some(UsagePattern::Luxury), 4) => 500,
        _ => DEFAULT_DHW_LITRES,
    };

    TankRecommendation {
        litres,
        price: f64::from(litres) * DHW_PRICE_PER_LITRE,
    }
}

/// `power × 20` litres for radiators, `power × 15` otherwise, rounded up.
pub fn recommend_buffer_tank(power_kw: f64, heating: Option<HeatingType>) -> TankRecommendation {
    let per_kw = if heating == Some(HeatingType::Radiators) {
        20.0
    } else {
        15.0
    };
    let litres = whole_units(power_kw * per_kw);

    TankRecommendation {
        litres,
        price: f64::from(litres) * BUFFER_PRICE_PER_LITRE,
    }
}

pub fn additional_components(heating: Option<HeatingType>) -> Vec<Component> {
    let mut components = vec![Component {
        name: "Moduł WiFi".into(),
        price: 599.0,
        description: "Zdalne sterowanie przez aplikację".into(),
    }];

    if heating == Some(HeatingType::Mixed) {
        components.push(Component {
            name: "Separator hydrauliczny".into(),
            price: 899.0,
            description: "Rozdzielenie obiegów grzewczych".into(),
        });
    }

    components.push(Component {
        name: "Fundament antywibracyjny".into(),
        price: 1299.0,
        description: "Redukcja drgań i hałasu".into(),
    });
    components
}

fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn recommend_kit(power_kw: f64, options: &KitOptions) -> KitRecommendation {
    let pump = recommend_pump(power_kw, options.pump_type);
    let buffer_tank = recommend_buffer_tank(power_kw, options.heating_type);
    let dhw_tank = options
        .dhw
        .map(|(residents, pattern)| recommend_dhw_tank(residents, pattern));
    let additional = additional_components(options.heating_type);

    let net = pump.price
        + buffer_tank.price
        + dhw_tank.map_or(0.0, |tank| tank.price)
        + additional.iter().map(|c| c.price).sum::<f64>();
    let gross = round_money(net * (1.0 + options.vat_rate));

    KitRecommendation {
        power_kw,
        pump,
        buffer_tank,
        dhw_tank,
        additional,
        net,
        vat_rate: options.vat_rate,
        gross,
        total: gross,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pump_price_uses_rounded_up_power() {
        let split = recommend_pump(7.8, PumpType::Split);
        assert_eq!(split.model, "Panasonic Split 8kW");
        assert_eq!(split.price, 24_000.0);

        let mono = recommend_pump(7.8, PumpType::Monoblock);
        assert_eq!(mono.model, "Panasonic Monoblock 8kW");
        assert_eq!(mono.price, 22_400.0);
    }

    #[test]
    fn dhw_table_caps_residents() {
        assert_eq!(recommend_dhw_tank(2, Some(UsagePattern::Economical)).litres, 200);
        assert_eq!(recommend_dhw_tank(9, Some(UsagePattern::Luxury)).litres, 500);
        assert_eq!(recommend_dhw_tank(3, None).litres, DEFAULT_DHW_LITRES);
        assert_eq!(recommend_dhw_tank(4, Some(UsagePattern::Comfortable)).price, 3200.0);
    }

    #[test]
    fn buffer_depends_on_emitters() {
        assert_eq!(recommend_buffer_tank(7.8, Some(HeatingType::Radiators)).litres, 156);
        assert_eq!(recommend_buffer_tank(7.8, Some(HeatingType::Underfloor)).litres, 117);
        assert_eq!(recommend_buffer_tank(7.8, None).price, 117.0 * 6.0);
    }

    #[test]
    fn separator_only_for_mixed_systems() {
        assert_eq!(additional_components(None).len(), 2);
        let mixed = additional_components(Some(HeatingType::Mixed));
        assert!(mixed.iter().any(|c| c.name == "Separator hydrauliczny"));
    }

    #[test]
    fn kit_totals() {
        let options = KitOptions {
            pump_type: PumpType::Monoblock,
            heating_type: Some(HeatingType::Radiators),
            dhw: Some((4, Some(UsagePattern::Comfortable))),
            vat_rate: 0.08,
        };
        let kit = recommend_kit(7.8, &options);

        // 22400 pump + 936 buffer + 3200 tank + 599 + 1299
        assert_eq!(kit.net, 28_434.0);
        assert_eq!(kit.gross, 30_708.72);
        assert_eq!(kit.total, kit.gross);
        assert_eq!(kit.buffer_label(), "Bufor 156 l");
        assert_eq!(kit.cwu_label().as_deref(), Some("Zasobnik CWU 400 l"));

        let fields = kit.state_fields();
        assert_eq!(fields["kit"], "Panasonic Monoblock 8kW");
        assert_eq!(fields["priceNet"], 28_434.0);
    }

    #[test]
    fn options_from_form() {
        let mut form = FormData::from_pairs([
            ("pump_type", "split"),
            ("heating_type", "mixed"),
            ("residents", "3"),
            ("usage_pattern", "luxury"),
        ]);
        form.insert("cwu_needed", true);

        let options = KitOptions::from_form(&form, 0.23);
        assert_eq!(options.pump_type, PumpType::Split);
        assert_eq!(options.heating_type, Some(HeatingType::Mixed));
        assert_eq!(options.dhw, Some((3, Some(UsagePattern::Luxury))));
        assert_eq!(KitOptions::from_form(&FormData::new(), 0.08).pump_type, PumpType::Monoblock);
    }

    #[test]
    fn absurd_power_prices_without_overflow() {
        let kit = recommend_kit(1e12, &KitOptions::default());
        assert_eq!(kit.pump.power_kw, u32::MAX);
        assert_eq!(kit.buffer_tank.litres, u32::MAX);
        assert!(kit.net.is_finite());
        assert!(kit.gross > kit.net);
    }
}
