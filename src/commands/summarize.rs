use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;

use crate::commands::{CommandReport, effective_settings};
use crate::digest::cache::relative_age;
use crate::digest::gateway::SummarySource;
use crate::digest::pipeline::{self, DigestContext, SummarizeOptions as PipelineOptions};
use crate::digest::providers::ProviderRegistry;
use crate::digest::references::{ItemUrls, ReferenceResolver};
use crate::digest::render::markdown_to_html;
use crate::digest::settings::process_env;
use crate::digest::source::ThreadSource;
use crate::digest::transport::HttpTransport;

#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    pub thread_id: u64,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub no_cache: bool,
    pub html: bool,
    pub rendered: Option<PathBuf>,
}

pub fn run(opts: &SummarizeOptions) -> Result<CommandReport> {
    let registry = ProviderRegistry::builtin();
    let settings = effective_settings(&registry)?;
    let transport = HttpTransport::new()?;
    let mut report = CommandReport::new("summarize");

    let endpoints = &settings.endpoints;
    let source = ThreadSource::new(&transport, &endpoints.api_base, &endpoints.site_base);
    let prepared = pipeline::fetch_thread(&source, opts.thread_id, opts.rendered.as_deref())?;
    let urls = ItemUrls::new(&endpoints.site_base);
    report.detail(format!("thread={}", urls.thread_url(prepared.thread_id)));
    if !prepared.title.is_empty() {
        report.detail(format!("title={}", prepared.title));
    }
    report.detail(format!("comments={}", prepared.formatted.comment_count));

    let ctx = DigestContext {
        settings: &settings,
        registry: &registry,
        transport: &transport,
        env_lookup: &process_env,
    };
    let pipeline_opts = PipelineOptions {
        provider: opts.provider.clone(),
        model: opts.model.clone(),
        bypass_cache: opts.no_cache,
    };

    let result = match pipeline::summarize(&ctx, &prepared, &pipeline_opts) {
        Ok(result) => result,
        Err(err) if err.is_expected() => {
            report.detail(format!("status={}", err.code()));
            report.output(err.user_message());
            return Ok(report);
        }
        Err(err) => {
            report.issue(format!("{}: {}", err.code(), err.user_message()));
            return Ok(report);
        }
    };

    match &result.source {
        SummarySource::Cache { created_at } => {
            report.detail("source=cache".to_string());
            report.detail(format!("cached={}", relative_age(created_at, Utc::now())));
        }
        SummarySource::Provider => {
            report.detail(format!("source={}/{}", result.provider_id, result.model_id));
            if result.truncated {
                report.detail(format!(
                    "truncated=true estimated_tokens={}",
                    result.estimated_input_tokens
                ));
            }
        }
    }

    let resolver = ReferenceResolver::new(urls);
    let index = &prepared.formatted.path_index;
    let rendered = if opts.html {
        resolver.resolve_html(&markdown_to_html(&result.summary), index)
    } else {
        resolver.qualify_markdown(&result.summary, index, prepared.thread_id)
    };
    report.output(rendered);
    Ok(report)
}
