//! Claims listing command

use super::{print_json, Context};
use console::truncate_str;
use owo_colors::OwoColorize;
use tajy_api_client::{ClaimFilter, ClaimPage, ClaimSearch, SortOrder, TajyClient};
use tajy_cli::output::{format_count, Status};
use tajy_cli::progress::spinner;
use tajy_cli::OutputFormat;
use tajy_core::{Error, Result};
use tajy_telemetry::{metrics, Timer};

pub async fn run(
    ctx: &Context,
    page: usize,
    filter: &ClaimFilter,
    order: &SortOrder,
) -> Result<()> {
    let _timer = Timer::start("claims.duration_ms");
    metrics().increment("claims.pages");

    let client = TajyClient::new().map_err(Error::from)?;
    let search = ClaimSearch::new(client.claims_with(ctx.config.schema.backend.clone()))
        .with_fallback_threshold(ctx.config.schema.search.fallback_threshold);

    let pb = spinner("Loading claims", ctx.format.is_text());
    let listing = search.load_page(page, filter, order).await;
    pb.finish_and_clear();
    let listing = listing.map_err(Error::from)?;

    if listing.fuzzy_used {
        metrics().increment("claims.fuzzy_fallbacks");
    }
    if page == 0 && filter.is_empty() {
        metrics().gauge("claims.pending_follow_up", listing.pending_follow_up as u64);
    }

    match ctx.format {
        OutputFormat::Json => print_json(&listing),
        OutputFormat::Text => {
            print_listing(&listing, ctx.config.schema.backend.page_size);
            Ok(())
        }
    }
}

fn print_listing(listing: &ClaimPage, page_size: usize) {
    if let Some(query) = &listing.fuzzy_query {
        Status::warning(&format!("No exact matches; showing names similar to \"{query}\""));
    }

    if listing.claims.is_empty() {
        Status::info("No claims found");
        return;
    }

    let pages = usize::try_from(listing.total).unwrap_or(usize::MAX).div_ceil(page_size.max(1));
    Status::header(&format!(
        "{} (page {} of {})",
        format_count(usize::try_from(listing.total).unwrap_or(usize::MAX), "claim", "claims"),
        listing.page + 1,
        pages.max(1)
    ));

    if listing.pending_follow_up > 0 {
        Status::warning(&format_count(
            listing.pending_follow_up,
            "claim needs follow-up",
            "claims need follow-up",
        ));
    }

    for listed in &listing.claims {
        let claim = &listed.claim;
        let fecha = claim
            .fecha
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        let age = listed
            .days_elapsed
            .map(|days| format!("{days}d"))
            .unwrap_or_default();
        let line = format!(
            "{:>6}  {:<12}  {:<32}  {:<12}  {:<10}  {:>5}",
            claim.id,
            truncate_str(&claim.numero, 12, "…"),
            truncate_str(&claim.asegurado, 32, "…"),
            claim.estado.as_deref().unwrap_or("-"),
            fecha,
            age
        );
        if listed.needs_follow_up {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }
}
