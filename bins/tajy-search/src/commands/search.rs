//! Search command

use super::{print_json, Context};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tajy_api_client::TajyClient;
use tajy_cli::output::{format_count, results_table, Status};
use tajy_cli::progress::spinner;
use tajy_cli::OutputFormat;
use tajy_core::{Error, ErrorCode, Result, ResultExt};
use tajy_search::{
    CandidateSource, InMemorySource, Ranker, RankerConfig, ScoredResult, SearchCache, SearchError,
};
use tajy_telemetry::{metrics, Timer};
use tracing::warn;

/// Flags of the `search` command
pub struct SearchOptions {
    pub file: Option<PathBuf>,
    pub fallback: bool,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

pub async fn run(ctx: &Context, query: &str, opts: &SearchOptions) -> Result<()> {
    let config = ranker_config(ctx, opts)?;
    let trimmed = query.trim().chars().count();
    if trimmed < config.min_query_chars {
        return Err(Error::invalid_query(format!(
            "\"{query}\" has {trimmed} characters, need at least {}",
            config.min_query_chars
        )));
    }

    let ttl = Duration::from_millis(ctx.config.schema.search.ttl_ms);

    match &opts.file {
        Some(path) => {
            let source = load_candidates(path)?;
            let ranker = Ranker::with_cache(SearchCache::new(source).with_ttl(ttl), config);
            rank(ctx, &ranker, query, opts, false).await
        }
        None => {
            let client = TajyClient::new().map_err(Error::from)?;
            let claims = client.claims_with(ctx.config.schema.backend.clone());
            let ranker = Ranker::with_cache(SearchCache::new(claims).with_ttl(ttl), config);
            rank(ctx, &ranker, query, opts, true).await
        }
    }
}

fn ranker_config(ctx: &Context, opts: &SearchOptions) -> Result<RankerConfig> {
    let settings = &ctx.config.schema.search;
    let mut config = RankerConfig {
        primary_threshold: settings.primary_threshold,
        fallback_threshold: settings.fallback_threshold,
        min_query_chars: settings.min_query_chars,
    };

    if let Some(threshold) = opts.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::validation(format!(
                "--threshold {threshold} is outside [0, 1]"
            )));
        }
        if opts.fallback {
            config.fallback_threshold = threshold;
        } else {
            config.primary_threshold = threshold;
        }
    }
    Ok(config)
}

fn load_candidates(path: &Path) -> Result<InMemorySource> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }
    let context = format!("Loading candidates from {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(context.clone())?;
    InMemorySource::from_json(&content)
        .map_err(Error::from)
        .context(context)
        .with_suggestion("Expected a JSON array of {\"name\", \"externalRef\"} objects")
}

async fn rank<S: CandidateSource>(
    ctx: &Context,
    ranker: &Ranker<S>,
    query: &str,
    opts: &SearchOptions,
    remote: bool,
) -> Result<()> {
    let _timer = Timer::start("search.duration_ms");
    metrics().increment("search.queries");

    let pb = spinner("Searching claims", remote && ctx.format.is_text());
    let results = if opts.fallback {
        ranker.search_fallback(query).await
    } else {
        ranker.try_search(query).await.map_err(search_error)?
    };
    pb.finish_and_clear();

    if ranker.cache().stats().fetch_failures > 0 {
        warn!("Candidate source failed, results may be incomplete");
        if ctx.format.is_text() {
            Status::warning("Could not load candidates; results may be incomplete");
        }
    }

    metrics().increment_by("search.results", results.len() as u64);
    print_results(ctx.format, query, &results, opts.limit)
}

fn print_results(
    format: OutputFormat,
    query: &str,
    results: &[ScoredResult],
    limit: Option<usize>,
) -> Result<()> {
    let shown = &results[..limit.unwrap_or(results.len()).min(results.len())];

    match format {
        OutputFormat::Json => print_json(&shown),
        OutputFormat::Text => {
            if shown.is_empty() {
                Status::info(&format!("No matches for \"{query}\""));
                return Ok(());
            }
            Status::header(&format!(
                "{} for \"{query}\"",
                format_count(results.len(), "match", "matches")
            ));
            print!("{}", results_table(query, shown));
            Ok(())
        }
    }
}

fn search_error(err: SearchError) -> Error {
    match err {
        SearchError::InvalidQuery(message) => Error::invalid_query(message),
        SearchError::SourceUnavailable(message) => {
            Error::new(ErrorCode::SourceUnavailable, message)
        }
        SearchError::CacheCorruption(key) => {
            Error::new(ErrorCode::CacheCorruption, format!("Corrupt cache entry {key}"))
        }
    }
}
