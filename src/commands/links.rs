use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::commands::{CommandReport, effective_settings};
use crate::digest::pipeline;
use crate::digest::providers::ProviderRegistry;
use crate::digest::references::{ItemUrls, ReferenceResolver};
use crate::digest::source::ThreadSource;
use crate::digest::transport::HttpTransport;

#[derive(Debug, Clone)]
pub struct LinksOptions {
    pub thread_id: u64,
    pub summary: PathBuf,
    pub rendered: Option<PathBuf>,
}

/// Rebuild the path index for the thread and qualify a saved raw summary's
/// `[path]` references into comment URLs.
pub fn run(opts: &LinksOptions) -> Result<CommandReport> {
    let raw = fs::read_to_string(&opts.summary)
        .with_context(|| format!("failed to read {}", opts.summary.display()))?;
    let settings = effective_settings(&ProviderRegistry::builtin())?;
    let transport = HttpTransport::new()?;
    let mut report = CommandReport::new("links");

    let endpoints = &settings.endpoints;
    let source = ThreadSource::new(&transport, &endpoints.api_base, &endpoints.site_base);
    let prepared = pipeline::fetch_thread(&source, opts.thread_id, opts.rendered.as_deref())?;
    let index = &prepared.formatted.path_index;
    report.detail(format!("paths={}", index.len()));
    if index.is_empty() {
        report.issue(format!(
            "thread {} has no reconciled comments; references left as written",
            opts.thread_id
        ));
    }

    let resolver = ReferenceResolver::new(ItemUrls::new(&endpoints.site_base));
    report.output(resolver.qualify_markdown(&raw, index, opts.thread_id));
    Ok(report)
}
