//! Tajy search CLI
//!
//! Fuzzy policy-holder search over Aseguradora Tajy claims, from a local
//! candidate file or the hosted claims table.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tajy_cli::output::print_error;
use tajy_cli::OutputFormat;
use tajy_core::config::Config;
use tajy_telemetry::TelemetryConfig;

mod commands;

/// Fuzzy policy-holder search for Aseguradora Tajy
#[derive(Parser)]
#[command(name = "tajy-search")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a config file (defaults to .tajy.toml, tajy.toml, then the user config dir)
    #[arg(short, long, global = true, env = "TAJY_CONFIG")]
    config: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print collected metrics to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one name against a query
    Score {
        /// What the user typed
        query: String,
        /// Candidate name
        text: String,
    },

    /// Show the Spanish phonetic key of a name
    Phonetic {
        /// Name to encode
        text: String,
    },

    /// Rank policy holders by similarity to a query
    Search {
        /// What the user typed
        query: String,

        /// JSON array of candidates instead of the backend
        #[arg(long)]
        file: Option<PathBuf>,

        /// Bypass the cache and use the stricter fallback threshold
        #[arg(long)]
        fallback: bool,

        /// Override the minimum score
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Maximum results to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List claims, falling back to fuzzy name matching when nothing matches
    Claims {
        /// Policy holder name contains
        #[arg(short, long)]
        asegurado: Option<String>,

        /// Claim number contains
        #[arg(short, long)]
        numero: Option<String>,

        /// Exact claim state
        #[arg(short, long)]
        estado: Option<String>,

        /// Zero-based page
        #[arg(short, long, default_value = "0")]
        page: usize,

        /// Column to sort by (newest first when omitted)
        #[arg(long)]
        sort: Option<String>,

        /// Sort ascending
        #[arg(long, requires = "sort")]
        asc: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e, cli.format);
            return exit_code(e.exit_code());
        }
    };

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.schema.logging.level.clone()
    };
    let telemetry = TelemetryConfig::default()
        .with_level(level)
        .with_json(config.schema.logging.json);
    if let Err(e) = tajy_telemetry::init_with_config(&telemetry) {
        eprintln!("warning: {e}");
    }

    let ctx = commands::Context {
        config,
        format: cli.format,
    };

    let result = match cli.command {
        Commands::Score { query, text } => commands::score::run(&ctx, &query, &text),

        Commands::Phonetic { text } => commands::phonetic::run(&ctx, &text),

        Commands::Search {
            query,
            file,
            fallback,
            threshold,
            limit,
        } => {
            let opts = commands::search::SearchOptions {
                file,
                fallback,
                threshold,
                limit,
            };
            commands::search::run(&ctx, &query, &opts).await
        }

        Commands::Claims {
            asegurado,
            numero,
            estado,
            page,
            sort,
            asc,
        } => {
            let filter = tajy_api_client::ClaimFilter {
                asegurado,
                numero,
                estado,
            };
            let mut order = tajy_api_client::SortOrder::default();
            if let Some(column) = sort {
                order.column = column;
                order.ascending = asc;
            }
            commands::claims::run(&ctx, page, &filter, &order).await
        }
    };

    if cli.metrics {
        match serde_json::to_string_pretty(&tajy_telemetry::metrics().export_json()) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => eprintln!("warning: could not export metrics: {e}"),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e, cli.format);
            exit_code(e.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
