//! PostgREST query strings and response headers
//!
//! Filters are kept as `(column, operator.value)` pairs and handed to
//! `reqwest` for URL encoding.

use std::fmt;

/// Filter, ordering and paging parameters for one table request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestQuery {
    pairs: Vec<(String, String)>,
}

impl RestQuery {
    /// Empty query (selects every column)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return, e.g. `asegurado,numero`
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns)
    }

    /// `column = value`
    #[must_use]
    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    /// Case-insensitive substring match on `column`
    #[must_use]
    pub fn ilike(self, column: &str, needle: &str) -> Self {
        self.param(column, format!("ilike.*{}*", escape_like(needle)))
    }

    /// Sort by `column`
    #[must_use]
    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.param("order", format!("{column}.{direction}"))
    }

    /// At most `n` rows
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.param("limit", n.to_string())
    }

    /// Raw parameter
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.pairs.push((key.to_string(), value.into()));
        self
    }

    /// Parameters in insertion order
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

impl fmt::Display for RestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// PostgREST uses `*` as the wildcard; reserved characters in the needle
/// would otherwise change the filter.
fn escape_like(needle: &str) -> String {
    needle
        .chars()
        .map(|c| match c {
            '*' | '%' | ',' | '(' | ')' => ' ',
            other => other,
        })
        .collect()
}

/// `Range` header value for rows `[offset, offset + len)`
#[must_use]
pub fn range_header(offset: usize, len: usize) -> String {
    format!("{offset}-{}", offset.saturating_add(len.max(1) - 1))
}

/// Total row count from a `Content-Range` header such as `0-49/123` or `*/0`.
///
/// Returns `None` when the total is unknown (`*`) or the header is malformed.
#[must_use]
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_filters_in_order() {
        let query = RestQuery::new()
            .select("asegurado,numero")
            .eq("user_id", "u-1")
            .order("asegurado", true);

        assert_eq!(
            query.to_string(),
            "select=asegurado,numero&user_id=eq.u-1&order=asegurado.asc"
        );
    }

    #[test]
    fn test_ilike_wraps_and_escapes() {
        let query = RestQuery::new().ilike("asegurado", "ana*(x)");
        assert_eq!(query.pairs()[0].1, "ilike.*ana  x *");
    }

    #[test]
    fn test_order_desc_and_limit() {
        let query = RestQuery::new().order("created_at", false).limit(1);
        assert_eq!(query.to_string(), "order=created_at.desc&limit=1");
    }

    #[test]
    fn test_range_header() {
        assert_eq!(range_header(0, 50), "0-49");
        assert_eq!(range_header(100, 50), "100-149");
        assert_eq!(range_header(0, 0), "0-0");
        assert_eq!(range_header(usize::MAX - 1, 50), format!("{}-{}", usize::MAX - 1, usize::MAX));
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-49/123"), Some(123));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-49/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
