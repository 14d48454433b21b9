//! Plain-text panels for the terminal client.

use std::fmt::Write;

use crate::analysis::{AnalysisError, AnalysisReport};
use crate::calculation::CalculationResult;
use crate::pricing::KitRecommendation;
use crate::state::QuoteState;
use crate::validation::FormValidation;

const NOT_FOUND: &str = "Nie wykryto";

/// `30708.72` becomes `30 708,72 zł`.
pub fn format_pln(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    format!("{sign}{grouped},{:02} zł", cents % 100)
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<24} {value}", format!("{label}:"));
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| NOT_FOUND.to_string(), |value| format!("{value} {unit}"))
}

pub fn results_panel(state: &QuoteState) -> String {
    let mut out = String::from("Twoja rekomendacja\n");
    row(&mut out, "Moc pompy ciepła", with_unit(state.power(), "kW"));
    row(&mut out, "Zestaw", state.kit.as_deref().unwrap_or("-"));
    row(&mut out, "Bufor", state.buffer.as_deref().unwrap_or("-"));
    row(&mut out, "Zasobnik CWU", state.cwu.as_deref().unwrap_or("brak"));
    if let Some(net) = state.price_net {
        row(&mut out, "Cena netto", format_pln(net));
    }
    row(
        &mut out,
        "Cena brutto",
        state.price.map_or_else(|| "-".to_string(), format_pln),
    );
    out
}

pub fn calculation_summary(result: &CalculationResult) -> String {
    let mut out = format!("{}\n", result.method.description());
    row(&mut out, "Obliczona moc", format!("{} kW", result.calculated_power));
    if let Some(formula) = &result.formula {
        row(&mut out, "Wzór", formula);
    }
    row(&mut out, "Obliczenie", &result.calculation);
    if let Some(annual) = result.annual_demand {
        row(&mut out, "Zapotrzebowanie roczne", format!("{annual} kWh"));
    }
    if let Some(source) = &result.source {
        row(&mut out, "Źródło", source);
    }
    if let Some(note) = &result.note {
        let _ = writeln!(out, "  {note}");
    }
    out
}

pub fn kit_summary(kit: &KitRecommendation) -> String {
    let mut out = format!("Zestaw dla {} kW\n", kit.power_kw);
    row(
        &mut out,
        &kit.pump.model,
        format!("{} ({})", format_pln(kit.pump.price), kit.pump.efficiency),
    );
    row(&mut out, &kit.buffer_label(), format_pln(kit.buffer_tank.price));
    if let (Some(label), Some(tank)) = (kit.cwu_label(), kit.dhw_tank) {
        row(&mut out, &label, format_pln(tank.price));
    }
    for component in &kit.additional {
        row(&mut out, &component.name, format_pln(component.price));
    }
    row(&mut out, "Netto", format_pln(kit.net));
    row(
        &mut out,
        &format!("Brutto (VAT {}%)", (kit.vat_rate * 100.0).round()),
        format_pln(kit.gross),
    );
    out
}

fn data_quality(quality: &str) -> &str {
    match quality {
        "good" => "Dobra",
        "partial" => "Częściowa",
        "insufficient" => "Niewystarczająca",
        other => other,
    }
}

pub fn analysis_results(report: &AnalysisReport) -> String {
    let mut out = String::from("Wyniki Analizy AI\n");
    row(&mut out, "Powierzchnia użytkowa", with_unit(report.area, "m²"));
    row(&mut out, "Wskaźnik EU", with_unit(report.eu_index, "kWh/m²·rok"));
    row(
        &mut out,
        "Lokalizacja",
        report.location.as_deref().unwrap_or(NOT_FOUND),
    );
    row(
        &mut out,
        "Obliczona moc",
        report
            .calculated_power
            .map_or_else(|| "Nie obliczono".to_string(), |power| format!("{power} kW")),
    );
    row(
        &mut out,
        "Metoda obliczenia",
        report.method.as_deref().unwrap_or("Brak danych"),
    );
    if let Some(quality) = &report.data_quality {
        row(&mut out, "Jakość danych", data_quality(quality));
    }
    if let Some(percent) = report.confidence_percent() {
        row(&mut out, "Pewność analizy", format!("{percent}%"));
    }
    if let Some(summary) = &report.summary {
        let _ = writeln!(out, "  Podsumowanie analizy: {summary}");
    }
    out
}

pub fn analysis_error(err: &AnalysisError) -> String {
    let mut out = format!("Błąd analizy: {err}\n");
    if err.is_retryable() {
        out.push_str("  Spróbuj ponownie lub wprowadź dane ręcznie.\n");
    } else if !matches!(err, AnalysisError::Cancelled | AnalysisError::Busy) {
        out.push_str("  Wybierz inny plik PDF.\n");
    }
    out
}

pub fn validation_errors(validation: &FormValidation) -> String {
    if validation.valid {
        return String::new();
    }
    let mut out = String::from("Popraw błędy w formularzu:\n");
    for error in &validation.errors {
        let _ = writeln!(out, "  {}: {}", error.field, error.message);
    }
    out
}
