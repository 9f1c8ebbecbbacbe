//! Phonetic key command

use super::{print_json, Context};
use tajy_cli::OutputFormat;
use tajy_core::Result;
use tajy_search::phonetic_key;

pub fn run(ctx: &Context, text: &str) -> Result<()> {
    let key = phonetic_key(text);

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "text": text, "key": key })),
        OutputFormat::Text => {
            println!("{key}");
            Ok(())
        }
    }
}
