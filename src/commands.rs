//! One handler per CLI subcommand. Handlers return the text to print; the
//! caller decides where it goes.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;

use crate::analysis::{self, PdfFile};
use crate::api::QuoteBackend;
use crate::calculation::formulas::UsagePattern;
use crate::cli::{Command, ConfigCommand, StateCommand};
use crate::flow::{FlowError, QuoteApp};
use crate::forms::{FormData, FormId};
use crate::pricing::{HeatingType, KitOptions, PumpType};
use crate::render;
use crate::settings::{ClientSettings, SettingsStore};

pub async fn execute<B: QuoteBackend>(app: &QuoteApp<B>, command: Command) -> Result<String> {
    match command {
        Command::Navigate { route } => navigate(app, &route).await,
        Command::Back => {
            let route = app.go_back().await;
            Ok(format!("{} ({})", route.title(), app.query_string()))
        }
        Command::Submit {
            form,
            fields,
            restore,
        } => submit(app, &form, fields, restore).await,
        Command::Restore { form } => restore_form(app, &form).await,
        Command::Analyze { path } => analyze(app, &path).await,
        Command::AnalysisStatus { id } => {
            let status = analysis::analysis_status(app.backend(), &id).await?;
            Ok(serde_json::to_string_pretty(&status)?)
        }
        Command::CancelAnalysis { id } => {
            let response = analysis::cancel_analysis(app.backend(), &id).await?;
            Ok(serde_json::to_string_pretty(&response)?)
        }
        Command::Recommend {
            power,
            pump_type,
            heating_type,
            residents,
            usage_pattern,
        } => {
            if !power.is_finite() || power <= 0.0 {
                bail!("power must be a positive number of kW");
            }
            let options = KitOptions {
                pump_type: pump_type
                    .as_deref()
                    .and_then(PumpType::parse)
                    .unwrap_or_default(),
                heating_type: heating_type.as_deref().and_then(HeatingType::parse),
                dhw: residents.map(|residents| {
                    (residents, usage_pattern.as_deref().and_then(UsagePattern::parse))
                }),
                vat_rate: app.settings().vat_rate,
            };
            Ok(render::kit_summary(&app.recommend(power, &options)))
        }
        Command::State(command) => state(app, command).await,
        Command::Email { to } => Ok(app.send_offer_email(&to).await?),
        Command::Offer { out } => offer(app, out.as_deref()).await,
        Command::Health => health(app).await,
        Command::Config(_) => bail!("config runs against settings.json, before the app starts"),
    }
}

/// `config show|set`. Edits the stored file; environment overrides are not
/// written back.
pub fn configure(store: &SettingsStore, command: ConfigCommand) -> Result<String> {
    match command {
        ConfigCommand::Show => Ok(serde_json::to_string_pretty(&store.client())?),
        ConfigCommand::Set { key, value } => {
            let Value::Object(mut fields) = serde_json::to_value(store.client())? else {
                bail!("settings did not serialize to an object");
            };
            if !fields.contains_key(&key) {
                bail!("unknown setting: {key}");
            }
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            fields.insert(key.clone(), value);

            let settings: ClientSettings = serde_json::from_value(Value::Object(fields))
                .with_context(|| format!("invalid value for {key}"))?;
            store.update_client(settings)?;
            Ok(format!("{key} updated"))
        }
    }
}

async fn navigate<B: QuoteBackend>(app: &QuoteApp<B>, route: &str) -> Result<String> {
    if !app.navigate(route).await {
        bail!("route not found: {route}");
    }
    let current = app
        .current_route()
        .ok_or_else(|| anyhow!("router has no current route"))?;
    Ok(format!("{} ({})", current.title(), app.query_string()))
}

fn parse_form(form: &str) -> Result<FormId> {
    form.parse::<FormId>()
        .with_context(|| format!("unknown form '{form}'"))
}

async fn submit<B: QuoteBackend>(
    app: &QuoteApp<B>,
    form: &str,
    fields: Vec<(String, String)>,
    restore: bool,
) -> Result<String> {
    let form = parse_form(form)?;
    let mut data = if restore {
        app.restore_form(form).await.unwrap_or_default()
    } else {
        FormData::new()
    };
    for (key, value) in fields {
        data.insert(key, value);
    }

    match app.submit(form, &data).await {
        Ok(outcome) => Ok(format!(
            "{}\n{}\n{}",
            render::calculation_summary(&outcome.result),
            render::kit_summary(&outcome.kit),
            render::results_panel(&app.state().get_all())
        )),
        Err(FlowError::Invalid(validation)) => bail!(render::validation_errors(&validation)),
        Err(err) => Err(err.into()),
    }
}

async fn restore_form<B: QuoteBackend>(app: &QuoteApp<B>, form: &str) -> Result<String> {
    let form = parse_form(form)?;
    match app.restore_form(form).await {
        Some(data) => Ok(serde_json::to_string_pretty(&data)?),
        None => Ok(format!("No saved data for {form}")),
    }
}

async fn analyze<B: QuoteBackend>(app: &QuoteApp<B>, path: &Path) -> Result<String> {
    let file = PdfFile::read(path).await?;
    match app.analyze(file).await {
        Ok(report) => Ok(render::analysis_results(&report)),
        Err(err) => bail!(render::analysis_error(&err)),
    }
}

async fn state<B: QuoteBackend>(app: &QuoteApp<B>, command: StateCommand) -> Result<String> {
    let state = app.state();
    match command {
        StateCommand::Show => Ok(render::results_panel(&state.get_all())),
        StateCommand::Get { key } => match state.get(&key) {
            Some(value) => Ok(serde_json::to_string_pretty(&value)?),
            None => bail!("no such key: {key}"),
        },
        StateCommand::Set { key, value } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            state.set(&key, value).await?;
            Ok(format!("{key} updated"))
        }
        StateCommand::Reset => {
            state.reset().await;
            Ok("State reset".into())
        }
        StateCommand::Export => Ok(state.export()),
        StateCommand::Import { path } => {
            let json = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            state.import(&json).await?;
            Ok(format!("State imported from {}", path.display()))
        }
    }
}

async fn offer<B: QuoteBackend>(app: &QuoteApp<B>, out: Option<&Path>) -> Result<String> {
    let html = app.generate_offer_document().await?;
    match out {
        Some(path) => {
            tokio::fs::write(path, &html)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(format!("Offer written to {}", path.display()))
        }
        None => Ok(html),
    }
}

async fn health<B: QuoteBackend>(app: &QuoteApp<B>) -> Result<String> {
    let backend = app.backend();
    let analyzer = match backend.health().await {
        Ok(health) if health.analyzer_available() => "available".to_string(),
        Ok(_) => "unavailable".to_string(),
        Err(err) => format!("unreachable ({err})"),
    };
    let heating = match backend.heating_service_health().await {
        Ok(status) => status
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("ok")
            .to_string(),
        Err(err) => format!("unreachable ({err})"),
    };
    Ok(format!("PDF analyzer: {analyzer}\nHeating calculator: {heating}"))
}
