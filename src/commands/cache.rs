use anyhow::Result;
use chrono::Utc;

use crate::commands::{CommandReport, effective_settings};
use crate::digest::cache::SummaryCache;
use crate::digest::providers::ProviderRegistry;
use crate::digest::transport::HttpTransport;

pub fn run(thread_id: u64) -> Result<CommandReport> {
    let settings = effective_settings(&ProviderRegistry::builtin())?;
    let transport = HttpTransport::new()?;
    let mut report = CommandReport::new("cache");

    if !settings.server_cache_enabled {
        report.detail("server_cache_enabled=false (explicit lookup)".to_string());
    }
    let cache = SummaryCache::new(&transport, &settings.endpoints.cache_base);
    report.detail(format!("url={}", cache.url_for(thread_id)));
    match cache.get(thread_id) {
        Some(cached) => {
            report.detail(format!("created_at={}", cached.created_at));
            report.detail(format!("age={}", cached.age_label(Utc::now())));
            report.output(cached.summary);
        }
        None => report.detail(format!("no cached summary for thread {thread_id}")),
    }
    Ok(report)
}
