use crate::digest::transport::{HttpRequest, Transport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedSummary {
    pub summary: String,
    pub created_at: String,
}

impl CachedSummary {
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        relative_age(&self.created_at, now)
    }
}

/// Human readable age such as `3h ago`; falls back to the raw timestamp.
pub fn relative_age(created_at: &str, now: DateTime<Utc>) -> String {
    let Ok(created) = DateTime::parse_from_rfc3339(created_at.trim()) else {
        return created_at.to_string();
    };
    let secs = now.signed_duration_since(created).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Read-only client for the shared summary cache service.
pub struct SummaryCache<'a> {
    transport: &'a dyn Transport,
    base_url: String,
}

fn parse_cached(json: &Value) -> Option<CachedSummary> {
    let summary = json.get("summary").and_then(Value::as_str)?.trim();
    if summary.is_empty() {
        return None;
    }
    let created_at = json
        .get("created_at")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(CachedSummary {
        summary: summary.to_string(),
        created_at,
    })
}

impl<'a> SummaryCache<'a> {
    pub fn new(transport: &'a dyn Transport, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, thread_id: u64) -> String {
        format!("{}/summaries/{thread_id}", self.base_url)
    }

    /// A miss is `None` and stays quiet; any other failure also degrades to
    /// `None` but is logged.
    pub fn get(&self, thread_id: u64) -> Option<CachedSummary> {
        let request = HttpRequest::get(self.url_for(thread_id)).expect_404();
        match self.transport.send_json(&request) {
            Ok(None) => {
                log::debug!("no cached summary for thread {thread_id}");
                None
            }
            Ok(Some(json)) => {
                let parsed = parse_cached(&json);
                if parsed.is_none() {
                    log::warn!("cached summary for thread {thread_id} has no summary text");
                }
                parsed
            }
            Err(err) => {
                log::warn!("summary cache lookup failed for thread {thread_id}: {err}");
                None
            }
        }
    }
}
