//! Client-side ordering and filtering of search hits.

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::ValueEnum;

use crate::gateway::SearchHit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Backend ranking order
    #[default]
    Relevance,
    /// File name, A to Z
    Alphabetical,
    /// Most recently added first
    Date,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    #[default]
    All,
    Pdf,
    /// .txt and .md
    Text,
    /// .zip and .rar
    Archive,
}

impl KindFilter {
    pub fn matches(&self, file_name: &str) -> bool {
        let ext = extension(file_name);
        match self {
            KindFilter::All => true,
            KindFilter::Pdf => ext == "pdf",
            KindFilter::Text => matches!(ext.as_str(), "txt" | "md"),
            KindFilter::Archive => matches!(ext.as_str(), "zip" | "rar"),
        }
    }
}

fn extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Filter by kind, then order. Relevance keeps the backend's order.
pub fn arrange(hits: &[SearchHit], sort: SortOrder, kind: KindFilter) -> Vec<SearchHit> {
    let mut out: Vec<SearchHit> = hits
        .iter()
        .filter(|h| kind.matches(&h.file_name))
        .cloned()
        .collect();

    match sort {
        SortOrder::Relevance => {}
        SortOrder::Alphabetical => {
            out.sort_by_key(|h| h.file_name.to_lowercase());
        }
        SortOrder::Date => {
            out.sort_by_key(|h| {
                std::cmp::Reverse(
                    h.date_added
                        .as_deref()
                        .and_then(parse_timestamp)
                        .unwrap_or_default(),
                )
            });
        }
    }

    out
}

/// Accepts RFC 3339 and the naive ISO form the backend writes.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// "42s ago", "5m ago", "3h ago", "2d ago".
pub fn time_ago(raw: &str, now: DateTime<Utc>) -> Option<String> {
    let then = parse_timestamp(raw)?;
    let secs = (now - then).num_seconds().max(0);

    let text = if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    };
    Some(text)
}

/// Cut `text` to `max_chars` characters, marking the cut with "...".
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hit(id: i64, name: &str, date: Option<&str>) -> SearchHit {
        SearchHit {
            id,
            file_name: name.to_string(),
            chunk_text: String::new(),
            thumbnail_url: None,
            date_added: date.map(str::to_string),
            rrf_score: None,
        }
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.file_name.as_str()).collect()
    }

    #[test]
    fn test_relevance_keeps_order() {
        let hits = vec![hit(1, "b.pdf", None), hit(2, "a.pdf", None)];
        let out = arrange(&hits, SortOrder::Relevance, KindFilter::All);
        assert_eq!(names(&out), ["b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_alphabetical_ignores_case() {
        let hits = vec![hit(1, "beta.md", None), hit(2, "Alpha.md", None), hit(3, "gamma.md", None)];
        let out = arrange(&hits, SortOrder::Alphabetical, KindFilter::All);
        assert_eq!(names(&out), ["Alpha.md", "beta.md", "gamma.md"]);
    }

    #[test]
    fn test_date_newest_first_missing_last() {
        let hits = vec![
            hit(1, "old.txt", Some("2024-01-01T00:00:00")),
            hit(2, "undated.txt", None),
            hit(3, "new.txt", Some("2024-06-01T12:30:00+00:00")),
        ];
        let out = arrange(&hits, SortOrder::Date, KindFilter::All);
        assert_eq!(names(&out), ["new.txt", "old.txt", "undated.txt"]);
    }

    #[test]
    fn test_kind_filter() {
        let hits = vec![
            hit(1, "a.PDF", None),
            hit(2, "b.md", None),
            hit(3, "c.txt", None),
            hit(4, "d.rar", None),
            hit(5, "e.docx", None),
        ];
        assert_eq!(names(&arrange(&hits, SortOrder::Relevance, KindFilter::Pdf)), ["a.PDF"]);
        assert_eq!(
            names(&arrange(&hits, SortOrder::Relevance, KindFilter::Text)),
            ["b.md", "c.txt"]
        );
        assert_eq!(names(&arrange(&hits, SortOrder::Relevance, KindFilter::Archive)), ["d.rar"]);
        assert_eq!(arrange(&hits, SortOrder::Relevance, KindFilter::All).len(), 5);
    }

    #[test]
    fn test_time_ago_units() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(time_ago("2024-06-10T11:59:30", now).as_deref(), Some("30s ago"));
        assert_eq!(time_ago("2024-06-10T11:15:00", now).as_deref(), Some("45m ago"));
        assert_eq!(time_ago("2024-06-10T09:00:00Z", now).as_deref(), Some("3h ago"));
        assert_eq!(time_ago("2024-06-08 12:00:00", now).as_deref(), Some("2d ago"));
        assert_eq!(time_ago("yesterday", now), None);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 200), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("héllo wörld", 5), "héllo...");
    }
}
