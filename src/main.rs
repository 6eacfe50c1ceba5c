//! Sentilens CLI
//!
//! Command-line interface for the sentiment API:
//! - Analyze, compare and explain single texts
//! - Run CSV batches and export their results
//! - Interactive shell with a session history

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentilens::batch::{BatchPhase, ProgressReporter};
use sentilens::{
    AnalysisSettings, AnalysisView, BatchResult, BatchView, ComparisonView, Config,
    ExplanationView, HistoryView, LoggingConfig, SentimentClient, SentimentService,
    StatisticsView,
};

#[derive(Parser)]
#[command(name = "sentilens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sentiment analysis client")]
#[command(long_about = "Sentilens talks to a sentiment-analysis API.\nAnalyze single texts, compare thresholds, explain decisions and run CSV batches.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sentiment API URL (overrides the config file)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: <config_dir>/sentilens/config.toml or ./sentilens.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the sentiment of a text
    Analyze {
        /// Text to analyze (3 to 5000 characters)
        text: String,
        /// Language code (auto, es, en, ...)
        #[arg(short, long)]
        language: Option<String>,
        /// Classification threshold between 0 and 1
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Classify a text at thresholds 0.3, 0.5 and 0.7
    Compare {
        text: String,
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Show the words that drove the classification of a text
    Explain {
        text: String,
        #[arg(short, long)]
        language: Option<String>,
        /// Number of words to request
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Analyze every text of a CSV file with a `texto` column
    Batch {
        /// Path to the CSV file
        path: PathBuf,
        #[arg(short, long)]
        language: Option<String>,
        /// Write the results as CSV
        #[arg(long)]
        csv_out: Option<PathBuf>,
        /// Write the results as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
    },

    /// Interactive session with history and statistics
    Shell,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", user_message(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.url = url.clone();
    }

    init_logging(&config.logging);
    tracing::debug!(api_url = %config.api.url, "Sentilens v{}", env!("CARGO_PKG_VERSION"));

    let client = SentimentClient::new(config.client_config()).map_err(sentilens::Error::from)?;
    let service = SentimentService::new(Arc::new(client), config.service_config());
    let format = cli.format;

    match cli.command {
        Commands::Analyze {
            text,
            language,
            threshold,
        } => {
            let defaults = &service.config().analysis;
            let settings = AnalysisSettings {
                language: language.unwrap_or_else(|| defaults.language.clone()),
                threshold: threshold.unwrap_or(defaults.threshold),
            };
            let record = service.analyze(&text, &settings).await?;
            emit(format, &AnalysisView::from(&record))?;
        }

        Commands::Compare { text, language } => {
            let comparison = service.compare(&text, language.as_deref()).await?;
            emit(format, &ComparisonView::from(&comparison))?;
        }

        Commands::Explain {
            text,
            language,
            top_n,
        } => {
            let explanation = service
                .explain(Some(&text), language.as_deref(), top_n)
                .await?;
            emit(format, &ExplanationView::from(&explanation))?;
        }

        Commands::Batch {
            path,
            language,
            csv_out,
            json_out,
        } => {
            let result = service
                .run_batch_file(&path, language.as_deref(), &CliProgress)
                .await?;
            emit(format, &BatchView::from(&result))?;
            export_batch(&service, csv_out.as_deref(), json_out.as_deref()).await?;
        }

        Commands::Shell => shell(&service, format).await?,

        // written before the config is loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Single message shown for a failed command
fn user_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<sentilens::Error>() {
        Some(e) => e.user_message(),
        None => format!("{:#}", error),
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sentilens={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn emit<T: Serialize + Display>(format: OutputFormat, view: &T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        OutputFormat::Table => println!("{}", view),
    }
    Ok(())
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = sentilens::config::generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

async fn export_batch(
    service: &SentimentService,
    csv_out: Option<&Path>,
    json_out: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(path) = csv_out {
        let csv = service.export_csv().await?;
        tokio::fs::write(path, csv)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        eprintln!("Results exported to {:?}", path);
    }
    if let Some(path) = json_out {
        let json = service.export_json(Utc::now()).await?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        eprintln!("Results exported to {:?}", path);
    }
    Ok(())
}

/// Progress lines on stderr
struct CliProgress;

impl ProgressReporter for CliProgress {
    fn phase_started(&self, phase: BatchPhase, message: &str) {
        let (from, _) = phase.progress_range();
        eprintln!("[{:>3}%] {}", from, message);
    }

    fn completed(&self, _result: &BatchResult) {
        eprintln!("[100%] Done");
    }
}

// ============================================
// Interactive shell
// ============================================

#[derive(Debug, PartialEq)]
enum ShellCommand {
    Analyze(String),
    Compare(String),
    Explain(Option<String>),
    Batch(PathBuf),
    Export { csv: bool, path: PathBuf },
    History,
    Stats,
    Remove(i64),
    Reanalyze(i64),
    Clear,
    Help,
    Quit,
}

const SHELL_HELP: &str = "\
Commands:
  analyze <text>        Analyze a text (also: any line that is not a command)
  compare <text>        Classify at thresholds 0.3, 0.5 and 0.7
  explain [text]        Explain a text, or the last analyzed one
  batch <file.csv>      Run a CSV batch
  export csv|json <path>  Export the last batch results
  history               List recent analyses
  stats                 Session statistics
  reanalyze <id>        Analyze a history entry again
  remove <id>           Delete a history entry
  clear                 Delete the whole history
  help                  Show this help
  quit                  Leave the shell";

fn parse_shell_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let parse_id = |rest: &str| {
        rest.parse::<i64>()
            .map_err(|_| format!("Expected a history id, got {:?}", rest))
    };

    match word.to_lowercase().as_str() {
        "analyze" => Ok(ShellCommand::Analyze(rest.to_string())),
        "compare" => Ok(ShellCommand::Compare(rest.to_string())),
        "explain" if rest.is_empty() => Ok(ShellCommand::Explain(None)),
        "explain" => Ok(ShellCommand::Explain(Some(rest.to_string()))),
        "batch" if rest.is_empty() => Err("Usage: batch <file.csv>".to_string()),
        "batch" => Ok(ShellCommand::Batch(PathBuf::from(rest))),
        "export" => match rest.split_once(char::is_whitespace) {
            Some((kind, path)) if kind.eq_ignore_ascii_case("csv") => Ok(ShellCommand::Export {
                csv: true,
                path: PathBuf::from(path.trim()),
            }),
            Some((kind, path)) if kind.eq_ignore_ascii_case("json") => Ok(ShellCommand::Export {
                csv: false,
                path: PathBuf::from(path.trim()),
            }),
            _ => Err("Usage: export csv|json <path>".to_string()),
        },
        "history" => Ok(ShellCommand::History),
        "stats" => Ok(ShellCommand::Stats),
        "remove" => parse_id(rest).map(ShellCommand::Remove),
        "reanalyze" => parse_id(rest).map(ShellCommand::Reanalyze),
        "clear" => Ok(ShellCommand::Clear),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        _ => Ok(ShellCommand::Analyze(line.to_string())),
    }
}

async fn shell(service: &SentimentService, format: OutputFormat) -> anyhow::Result<()> {
    println!("Sentilens v{} - type 'help' for commands", env!("CARGO_PKG_VERSION"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_shell_command(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => command,
            Err(usage) => {
                eprintln!("{}", usage);
                continue;
            }
        };

        if let Err(e) = run_shell_command(service, format, command).await {
            eprintln!("Error: {}", user_message(&e));
        }
    }

    Ok(())
}

async fn run_shell_command(
    service: &SentimentService,
    format: OutputFormat,
    command: ShellCommand,
) -> anyhow::Result<()> {
    match command {
        ShellCommand::Analyze(text) => {
            let record = service.analyze_default(&text).await?;
            emit(format, &AnalysisView::from(&record))?;
        }
        ShellCommand::Compare(text) => {
            let comparison = service.compare(&text, None).await?;
            emit(format, &ComparisonView::from(&comparison))?;
        }
        ShellCommand::Explain(text) => {
            let explanation = service.explain(text.as_deref(), None, None).await?;
            emit(format, &ExplanationView::from(&explanation))?;
        }
        ShellCommand::Batch(path) => {
            let result = service.run_batch_file(&path, None, &CliProgress).await?;
            emit(format, &BatchView::from(&result))?;
        }
        ShellCommand::Export { csv, path } => {
            if csv {
                export_batch(service, Some(&path), None).await?;
            } else {
                export_batch(service, None, Some(&path)).await?;
            }
        }
        ShellCommand::History => {
            let history = service.history().await;
            emit(format, &HistoryView::new(&history))?;
        }
        ShellCommand::Stats => {
            let stats = service.statistics().await;
            emit(format, &StatisticsView::from(&stats))?;
        }
        ShellCommand::Reanalyze(id) => {
            let record = service.reanalyze(id).await?;
            emit(format, &AnalysisView::from(&record))?;
        }
        ShellCommand::Remove(id) => {
            if service.remove(id).await {
                println!("Removed {}", id);
            } else {
                println!("No history entry {}", id);
            }
        }
        ShellCommand::Clear => {
            service.clear_history().await;
            println!("History cleared");
        }
        ShellCommand::Help => println!("{}", SHELL_HELP),
        ShellCommand::Quit => {}
    }
    Ok(())
}
