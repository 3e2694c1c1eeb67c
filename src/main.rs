//! metrics-sql CLI
//!
//! Command-line interface for generating store queries:
//! - Build SQL for a range-query request
//! - Generate a default config file

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_sql::config::{generate_default_config, Config, LoggingConfig};
use metrics_sql::{BuiltQueries, QueryBuilder, QueryRangeParams};

#[derive(Parser)]
#[command(name = "metrics-sql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate ClickHouse SQL for metric range queries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build queries for a JSON range-query request
    Build {
        /// Request file, or "-" for stdin
        request: String,
        /// Override range start. Supports: "now", "now-<n>[smhd]", ISO 8601, Unix ms
        #[arg(long)]
        start: Option<String>,
        /// Override range end (same formats as --start)
        #[arg(long)]
        end: Option<String>,
        /// Override bucket width in seconds
        #[arg(long)]
        step: Option<u64>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Build {
            request,
            start,
            end,
            step,
        } => {
            let body = if request == "-" {
                let mut body = String::new();
                std::io::stdin().read_to_string(&mut body)?;
                body
            } else {
                std::fs::read_to_string(&request)?
            };

            let mut params: QueryRangeParams = serde_json::from_str(&body)?;
            let now = Utc::now().timestamp_millis();
            if let Some(s) = start {
                params.start = parse_timestamp(&s, now)?;
            }
            if let Some(s) = end {
                params.end = parse_timestamp(&s, now)?;
            }
            if let Some(step) = step {
                params.step = step;
            }

            let builder = QueryBuilder::new(config.store.schema());
            tracing::info!(
                database = %builder.schema().database,
                start = params.start,
                end = params.end,
                step = params.step,
                formulas = params.composite_metric_query.formulas.len(),
                "Building queries"
            );

            let built = builder.build_queries(&params)?;
            match cli.format.to_lowercase().as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&built)?),
                _ => print!("{}", format_text(&built)),
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    tracing::info!("Wrote default config to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Initialize tracing to stderr so stdout carries only generated SQL
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// One query per line, plain queries first
fn format_text(built: &BuiltQueries) -> String {
    let mut out = String::new();
    for (idx, sql) in built.queries.iter().enumerate() {
        out.push_str(&format!("-- query {}\n{}\n", idx + 1, sql));
    }
    for (idx, sql) in built.formula_queries.iter().enumerate() {
        out.push_str(&format!("-- formula {}\n{}\n", idx + 1, sql));
    }
    out
}

/// Parse a timestamp argument into Unix milliseconds
fn parse_timestamp(s: &str, now: i64) -> Result<i64, String> {
    if s == "now" {
        return Ok(now);
    }

    if let Some(offset) = s.strip_prefix("now-") {
        return parse_duration(offset)
            .and_then(|d| now.checked_sub(d.num_milliseconds()))
            .ok_or_else(|| format!("Invalid relative time: {}", s));
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    s.parse::<i64>()
        .map_err(|_| format!("Invalid timestamp format: {}", s))
}

/// Parse duration like "7d", "24h", "30m", "15s"
fn parse_duration(s: &str) -> Option<Duration> {
    let unit = s.chars().last()?;
    let num: i64 = s[..s.len() - unit.len_utf8()].parse().ok()?;

    match unit {
        's' => Duration::try_seconds(num),
        'm' => Duration::try_minutes(num),
        'h' => Duration::try_hours(num),
        'd' => Duration::try_days(num),
        _ => None,
    }
}
