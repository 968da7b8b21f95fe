use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use prehab::forecast::TrainingStatus;
use prehab::logging::init_logging;
use prehab::{
    AnalysisEngine, AnalysisRequest, AnalysisResult, EngineConfig, HistoryPoint, LogLevel,
    PrehabError,
};

/// Prehab - Injury Risk Analytics CLI
///
/// Fuses rule-based readiness checks with anomaly detection, a recurrent
/// load forecaster, skeleton risk propagation and a training-action advisor.
#[derive(Parser)]
#[command(name = "prehab")]
#[command(author = "Prehab Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Injury Risk Analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single athlete request
    Analyze {
        /// Request JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "summary")]
        format: OutputFormat,

        /// Write the JSON result to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a squad of requests in parallel
    Squad {
        /// JSON file holding an array of requests
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Train the forecaster on a history and print the 15-day outlook
    Forecast {
        /// JSON file holding [[load, hrv, sleep], ...]
        #[arg(long)]
        history: PathBuf,
    },

    /// Manage configuration
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the active configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Summary,
}

#[derive(Tabled)]
struct SquadRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Athlete")]
    athlete: String,
    #[tabled(rename = "Report")]
    report: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Peak Forecast")]
    peak: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Risk %")]
    risk: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        // A missing explicit path is allowed so `config --init` can create it
        Some(path) if !path.exists() => EngineConfig::default(),
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Analyze {
            input,
            format,
            output,
        } => {
            let request: AnalysisRequest = read_json(&input)?;
            let engine = AnalysisEngine::with_config(config);
            let result = engine.analyze(&request);

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&result)?;
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("{}", format!("✓ Result written to {}", path.display()).green());
            }

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Summary => print_summary(&result),
            }
        }

        Commands::Squad { input } => {
            let requests: Vec<AnalysisRequest> = read_json(&input)?;
            let engine = AnalysisEngine::with_config(config);

            let pb = ProgressBar::new(requests.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})")?
                    .progress_chars("#>-"),
            );
            pb.set_message("analyzing");
            let results = engine.analyze_squad_with(&requests, |_| pb.inc(1));
            pb.finish_with_message("complete");

            print_squad(&results);
        }

        Commands::Forecast { history } => {
            let history: Vec<HistoryPoint> = read_json(&history)?;
            let engine = AnalysisEngine::with_config(config);
            let forecaster = engine.forecaster();

            match forecaster.train(&history).map_err(report)? {
                TrainingStatus::Trained {
                    version,
                    windows,
                    final_loss,
                } => println!(
                    "{}",
                    format!(
                        "✓ Trained model v{} on {} windows (loss {:.5})",
                        version, windows, final_loss
                    )
                    .green()
                ),
                TrainingStatus::InsufficientData { points, required } => println!(
                    "{}",
                    format!(
                        "⚠ {} days of history, {} needed to train; using the untrained model",
                        points, required
                    )
                    .yellow()
                ),
                TrainingStatus::Busy => println!("{}", "⚠ Training already in progress".yellow()),
            }

            let forecast = forecaster.forecast(&history).map_err(report)?;
            let rows: Vec<ForecastRow> = forecast
                .iter()
                .enumerate()
                .map(|(i, risk)| ForecastRow {
                    day: format!("T+{}", i + 1),
                    risk: format!("{:.1}", risk),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Config { init, show } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(EngineConfig::default_config_path);

            if init {
                let mut fresh = EngineConfig::default();
                fresh.save_to_file(&path)?;
                println!(
                    "{}",
                    format!("✓ Default configuration written to {}", path.display()).green()
                );
            }

            if show || !init {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Print the athlete-facing explanation before the error propagates
fn report(err: impl Into<PrehabError>) -> anyhow::Error {
    let err = err.into();
    eprintln!("{}", format!("✗ {}", err.user_message()).red());
    err.into()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn colorize_risk(value: f64) -> String {
    let text = format!("{:.1}", value);
    if value >= 70.0 {
        text.red().bold().to_string()
    } else if value >= 40.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

fn print_summary(result: &AnalysisResult) {
    println!(
        "{} {} ({})",
        "Athlete".bold(),
        result.user_id.cyan(),
        result.report_type
    );
    println!("  Risk score: {}", colorize_risk(result.score));

    if !result.alerts.is_empty() {
        println!("\n{}", "Alerts".bold());
        for alert in &result.alerts {
            println!("  {}", alert.yellow());
        }
    }

    if !result.recommendations.is_empty() {
        println!("\n{}", "Recommendations".bold());
        for (i, rec) in result.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, rec);
        }
    }

    if let Some(strategy) = &result.raw_metrics.rl_strategy {
        println!(
            "\n{} {} ({}% confidence, {})",
            "Strategy".bold(),
            strategy.action.to_string().green(),
            strategy.confidence,
            strategy.state
        );
        println!("  {}", strategy.explanation.dimmed());
    }

    let gnn = &result.raw_metrics.gnn_data;
    if gnn.active {
        println!(
            "\n{} {} (critical joint {})",
            "Biomechanics".bold(),
            colorize_risk(gnn.risk_score),
            gnn.critical_joint
        );
    }

    let peak = result.forecast.iter().cloned().fold(0.0_f64, f64::max);
    println!("\n{} peak {} over 15 days", "Forecast".bold(), colorize_risk(peak));
}

fn print_squad(results: &[AnalysisResult]) {
    let mut ranked: Vec<&AnalysisResult> = results.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let rows: Vec<SquadRow> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| SquadRow {
            rank: i + 1,
            athlete: r.user_id.clone(),
            report: r.report_type.clone(),
            score: format!("{:.1}", r.score),
            peak: format!("{:.1}", r.forecast.iter().cloned().fold(0.0_f64, f64::max)),
            strategy: r
                .raw_metrics
                .rl_strategy
                .as_ref()
                .map(|s| s.action.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}
