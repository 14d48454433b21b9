use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "heatquote")]
#[command(about = "Heat-pump quote calculator client", version, long_about = None)]
pub struct Cli {
    /// Verbose logging, same as HEATQUOTE_DEV=1
    #[arg(long, global = true)]
    pub dev: bool,
    /// Backend origin, overrides settings.json and HEATQUOTE_BASE_URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Where state, autosaves and settings live
    #[arg(long, global = true, env = "HEATQUOTE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a section (welcome, mode1..mode4, results; tryb2 and 2 also work)
    Navigate { route: String },
    /// Return to the previous section
    Back,
    /// Validate, calculate and price one form
    Submit {
        /// Form id (mode1..mode4)
        form: String,
        /// Field value, repeatable: -f heated_area=120
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Start from the autosaved values of this form
        #[arg(long)]
        restore: bool,
    },
    /// Print the autosaved values of a form
    Restore { form: String },
    /// Upload a project PDF for AI analysis
    Analyze { path: PathBuf },
    /// Poll a running analysis
    AnalysisStatus { id: String },
    /// Cancel a running analysis
    CancelAnalysis { id: String },
    /// Price a kit for a given power
    Recommend {
        /// Heating power, kW
        #[arg(long)]
        power: f64,
        /// split or monoblock
        #[arg(long)]
        pump_type: Option<String>,
        /// radiators, underfloor or mixed
        #[arg(long)]
        heating_type: Option<String>,
        /// Residents, adds a hot-water tank
        #[arg(long)]
        residents: Option<u32>,
        /// economical, comfortable or luxury
        #[arg(long)]
        usage_pattern: Option<String>,
    },
    /// Inspect or edit the quote state
    #[command(subcommand)]
    State(StateCommand),
    /// Send the offer by e-mail
    Email { to: String },
    /// Generate the offer document
    Offer {
        /// Write the HTML here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the analyzer and heating-demand services
    Health,
    /// Show or change settings.json
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Results panel for the current state
    Show,
    /// One key as JSON
    Get { key: String },
    /// Set one key; the value is read as JSON, falling back to a string
    Set { key: String, value: String },
    /// Back to defaults
    Reset,
    /// Pretty JSON of the whole state
    Export,
    /// Merge a JSON export into the state
    Import { path: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Settings as stored, before environment overrides
    Show,
    /// Change one setting; the value is read as JSON, falling back to a string
    Set { key: String, value: String },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_key_value_pairs() {
        assert_eq!(
            parse_field("heated_area=120").unwrap(),
            ("heated_area".to_string(), "120".to_string())
        );
        assert_eq!(parse_field("note=a=b").unwrap().1, "a=b");
        assert!(parse_field("heated_area").is_err());
        assert!(parse_field("=1").is_err());
    }

    #[test]
    fn parses_submit_with_global_flags() {
        let cli = Cli::try_parse_from([
            "heatquote",
            "--dev",
            "submit",
            "mode2",
            "-f",
            "heated_area=100",
            "--field",
            "eu_index=70",
        ])
        .unwrap();

        assert!(cli.dev);
        match cli.command {
            Command::Submit { form, fields, restore } => {
                assert_eq!(form, "mode2");
                assert_eq!(fields.len(), 2);
                assert!(!restore);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
