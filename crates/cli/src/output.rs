//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use clap::ValueEnum;
use console::{measure_text_width, pad_str, Alignment};
use owo_colors::OwoColorize;
use std::fmt::Write as _;
use tajy_core::Error;
use tajy_search::{classify, ScoredResult};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

impl OutputFormat {
    /// Whether decorations (colors, spinners) belong in the output
    pub fn is_text(self) -> bool {
        self == Self::Text
    }
}

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(measure_text_width(message)));
    }
}

/// Report a failed command on stderr
pub fn print_error(err: &Error, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&err.to_report()) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{err}"),
        },
        OutputFormat::Text => {
            eprintln!("{} [{}] {}", "Error:".red().bold(), err.code, err.message);
            if let Some(context) = &err.context {
                eprintln!("  {} {context}", "Context:".dimmed());
            }
            if let Some(suggestion) = &err.suggestion {
                eprintln!("  {} {suggestion}", "Suggestion:".cyan());
            }
        }
    }
}

/// Plain-text table of ranked candidates
///
/// The tier column is recomputed from `query`, so it reads the same way
/// `tajy-search score` would report each row.
pub fn results_table(query: &str, results: &[ScoredResult]) -> String {
    let name_width = results
        .iter()
        .map(|r| measure_text_width(&r.item.name))
        .max()
        .unwrap_or(0)
        .max("Name".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:>5}  {:<15}  {}  Claim",
        "#",
        "Score",
        "Tier",
        pad_str("Name", name_width, Alignment::Left, None)
    );

    for (rank, result) in results.iter().enumerate() {
        let tier = classify(query, &result.item.name);
        let _ = writeln!(
            out,
            "{:>3}  {:>5.2}  {:<15}  {}  {}",
            rank + 1,
            result.score,
            tier.as_str(),
            pad_str(&result.item.name, name_width, Alignment::Left, None),
            result.item.external_ref
        );
    }
    out
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{mins}m {remaining_secs:.0}s")
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tajy_search::{Candidate, SearchResult};

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }

    #[test]
    fn test_format_duration_secs() {
        assert_eq!(format_duration(Duration::from_secs_f32(5.5)), "5.5s");
    }

    #[test]
    fn test_format_duration_mins() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "match", "matches"), "1 match");
        assert_eq!(format_count(0, "match", "matches"), "0 matches");
    }

    #[test]
    fn test_results_table_aligns_accented_names() {
        let results = vec![
            SearchResult {
                item: Candidate::new("José Núñez", "S-1"),
                score: 1.0,
            },
            SearchResult {
                item: Candidate::new("Jose Nunes", "S-22"),
                score: 0.82,
            },
        ];

        let table = results_table("jose nunez", &results);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("exact"));
        assert!(lines[1].ends_with("S-1"));
        assert!(lines[2].contains("0.82"));
        let claim_col = |line: &str| measure_text_width(&line[..line.rfind("S-").unwrap()]);
        assert_eq!(claim_col(lines[1]), claim_col(lines[2]));
    }

    #[test]
    fn test_output_format_is_text() {
        assert!(OutputFormat::default().is_text());
        assert!(!OutputFormat::Json.is_text());
    }
}
