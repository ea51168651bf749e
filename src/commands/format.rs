use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, effective_settings};
use crate::digest::pipeline;
use crate::digest::providers::ProviderRegistry;
use crate::digest::source::ThreadSource;
use crate::digest::transport::HttpTransport;

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub thread_id: u64,
    pub rendered: Option<PathBuf>,
}

pub fn run(opts: &FormatOptions) -> Result<CommandReport> {
    let settings = effective_settings(&ProviderRegistry::builtin())?;
    let transport = HttpTransport::new()?;
    let mut report = CommandReport::new("format");

    let source = ThreadSource::new(
        &transport,
        &settings.endpoints.api_base,
        &settings.endpoints.site_base,
    );
    let prepared = pipeline::fetch_thread(&source, opts.thread_id, opts.rendered.as_deref())?;
    report.detail(format!("thread={}", prepared.thread_id));
    report.detail(format!("comments={}", prepared.formatted.comment_count));
    if prepared.formatted.comment_count == 0 {
        report.detail("no comments could be reconciled".to_string());
    }
    report.output(prepared.formatted.text);
    Ok(report)
}
