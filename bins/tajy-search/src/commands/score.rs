//! Score command

use super::{print_json, Context};
use owo_colors::OwoColorize;
use tajy_cli::OutputFormat;
use tajy_core::Result;
use tajy_search::classify;

pub fn run(ctx: &Context, query: &str, text: &str) -> Result<()> {
    let tier = classify(query, text);

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "query": query,
            "text": text,
            "tier": tier.as_str(),
            "score": tier.score(),
        })),
        OutputFormat::Text => {
            let score = format!("{:.2}", tier.score());
            if tier.is_match() {
                println!("{} {tier}", score.green().bold());
            } else {
                println!("{} {tier}", score.red());
            }
            Ok(())
        }
    }
}
