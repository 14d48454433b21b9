pub mod analysis;
pub mod api;
pub mod calculation;
pub mod cli;
pub mod commands;
pub mod db;
pub mod flow;
pub mod forms;
pub mod notify;
pub mod offer;
pub mod pricing;
pub mod render;
pub mod router;
pub mod settings;
pub mod state;
pub mod utils;
pub mod validation;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;

use api::ApiClient;
use cli::{Cli, Command};
use db::Database;
use flow::QuoteApp;
use notify::ConsoleNotifier;
use settings::SettingsStore;
use state::StateStore;
use utils::logging::{default_level, is_truthy};

fn data_dir(overridden: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = overridden {
        return Ok(dir.to_path_buf());
    }
    ProjectDirs::from("pl", "TOP-INSTAL", "heatquote")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("could not determine a data directory; pass --data-dir"))
}

async fn start(cli: Cli) -> Result<String> {
    let app_data_dir = data_dir(cli.data_dir.as_deref())?;
    std::fs::create_dir_all(&app_data_dir)
        .with_context(|| format!("failed to create {}", app_data_dir.display()))?;

    let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
    let command = match cli.command {
        Command::Config(command) => return commands::configure(&settings_store, command),
        command => command,
    };
    let mut settings = settings_store.client().with_env_overrides();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    let database = Database::new(app_data_dir.join("heatquote.sqlite3"))?;
    let state = StateStore::load(database.clone()).await;
    let backend = ApiClient::new(&settings)?;

    log::debug!("Backend at {}", backend.base_url());
    let app = QuoteApp::new(
        backend,
        state,
        database,
        settings,
        Arc::new(ConsoleNotifier),
    );
    commands::execute(&app, command).await
}

pub fn run() {
    let cli = Cli::parse();
    let dev = cli.dev
        || std::env::var("HEATQUOTE_DEV")
            .map(|flag| is_truthy(&flag))
            .unwrap_or(false);

    // RUST_LOG still wins over the default level.
    env_logger::Builder::new()
        .filter_level(default_level(dev))
        .parse_default_env()
        .init();

    log::debug!("heatquote starting up...");

    let result = tokio::runtime::Runtime::new()
        .context("failed to start the async runtime")
        .and_then(|runtime| runtime.block_on(start(cli)));

    match result {
        Ok(output) => println!("{}", output.trim_end()),
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
