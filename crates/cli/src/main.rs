// dialsight CLI - headless reconciliation and metrics reports

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use dialsight_io::{load_call_log, load_roster, load_validation};
use dialsight_recon::cooldown::{cooldown_feed, reattempt_potential};
use dialsight_recon::join::reconcile;
use dialsight_recon::metrics::{
    attempt_distribution, baseline_metrics, cooldown_metrics, data_hygiene_metrics, pilot_metrics,
    weekly_trends,
};
use dialsight_recon::{CallLogTable, EngineConfig, EngineError, RosterTable, ValidationTable};

#[derive(Parser)]
#[command(name = "dialsight")]
#[command(about = "Call-activity reconciliation and metrics reports")]
#[command(version)]
struct Cli {
    /// Directory holding the source data files
    #[arg(long, env = "DIALSIGHT_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Engine config TOML; built-in defaults are used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Call-event log file name within the data directory
    #[arg(long, default_value = "kixie_call_history.csv", global = true)]
    call_log_file: String,

    /// With-live-transfer validation feed file name
    #[arg(long, default_value = "telesign_with_live.csv", global = true)]
    with_live_file: String,

    /// Without-live-transfer validation feed file name
    #[arg(long, default_value = "telesign_without_live.csv", global = true)]
    without_live_file: String,

    /// Campaign roster file name
    #[arg(long, default_value = "powerlist_contacts.csv", global = true)]
    roster_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Baseline connect-rate and attempt metrics
    Baseline,

    /// Pilot-list projection with optional reporting overrides
    Pilot {
        /// Override the dial-at-a-time value echoed in the report
        #[arg(long)]
        dial_at_a_time: Option<u32>,

        /// Override the max-attempts value echoed in the report
        #[arg(long)]
        max_attempts: Option<i64>,
    },

    /// Weekly call-volume trend series
    Trends,

    /// Attempt-count distribution over the roster
    Attempts {
        /// Case-insensitive list-name substring filter
        #[arg(long)]
        list_name: Option<String>,
    },

    /// Cooldown membership, feed, and reattempt projection
    Cooldown,

    /// Cross-source coverage categories and carrier summary
    CrossRef,

    /// Validation-feed hygiene ratios
    Hygiene,

    /// Every report in one document
    Report,
}

struct Sources {
    call_log: CallLogTable,
    validation: ValidationTable,
    roster: RosterTable,
}

impl Sources {
    fn load(cli: &Cli) -> Self {
        Self {
            call_log: load_call_log(&cli.data_dir.join(&cli.call_log_file)),
            validation: load_validation(
                &cli.data_dir.join(&cli.with_live_file),
                &cli.data_dir.join(&cli.without_live_file),
            ),
            roster: load_roster(&cli.data_dir.join(&cli.roster_file)),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let config = match &cli.config {
        Some(path) => {
            let text =
                std::fs::read_to_string(path).map_err(|e| EngineError::Io(e.to_string()))?;
            EngineConfig::from_toml(&text)?
        }
        None => EngineConfig::default(),
    };

    let data = Sources::load(&cli);
    let now = Local::now().date_naive();

    match &cli.command {
        Commands::Baseline => emit(&baseline_metrics(&data.call_log, &data.roster, &config)),
        Commands::Pilot {
            dial_at_a_time,
            max_attempts,
        } => emit(&pilot_metrics(
            &data.call_log,
            &data.roster,
            &config,
            *dial_at_a_time,
            *max_attempts,
        )),
        Commands::Trends => emit(&weekly_trends(&data.call_log, &config)),
        Commands::Attempts { list_name } => emit(&attempt_distribution(
            &data.roster,
            list_name.as_deref(),
        )),
        Commands::Cooldown => emit(&cooldown_report(&data, &config, now)),
        Commands::CrossRef => emit(&reconcile(
            &data.roster,
            &data.validation,
            &data.call_log,
            &config,
        )),
        Commands::Hygiene => emit(&data_hygiene_metrics(&data.validation, &data.call_log)),
        Commands::Report => emit(&json!({
            "baseline": baseline_metrics(&data.call_log, &data.roster, &config),
            "pilot": pilot_metrics(&data.call_log, &data.roster, &config, None, None),
            "trends": weekly_trends(&data.call_log, &config),
            "attempts": attempt_distribution(&data.roster, None),
            "cooldown": cooldown_report(&data, &config, now),
            "cross_reference": reconcile(&data.roster, &data.validation, &data.call_log, &config),
            "hygiene": data_hygiene_metrics(&data.validation, &data.call_log),
        })),
    }
}

fn cooldown_report(data: &Sources, config: &EngineConfig, now: NaiveDate) -> serde_json::Value {
    json!({
        "metrics": cooldown_metrics(&data.roster, config, now),
        "reattempt": reattempt_potential(&data.roster, config, now),
        "feed": cooldown_feed(&data.roster, config, now),
    })
}

fn emit<T: Serialize>(value: &T) -> Result<(), EngineError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| EngineError::Io(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
