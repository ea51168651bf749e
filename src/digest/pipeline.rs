use crate::digest::cache::SummaryCache;
use crate::digest::eligibility::{self, Eligibility};
use crate::digest::format::{FormattedThread, format_thread};
use crate::digest::gateway::{Gateway, PromptConfig, SummaryInput, SummaryResult};
use crate::digest::providers::ProviderRegistry;
use crate::digest::reconcile::reconcile;
use crate::digest::settings::Settings;
use crate::digest::source::{ThreadSource, load_rendered_file};
use crate::digest::thread::{ApiCommentNode, EnrichedThread, RenderedComment};
use crate::digest::transport::Transport;
use crate::error::SummarizeError;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PreparedThread {
    pub thread_id: u64,
    pub title: String,
    pub thread: EnrichedThread,
    pub formatted: FormattedThread,
}

pub fn prepare(
    thread_id: u64,
    root: Option<&ApiCommentNode>,
    title: Option<String>,
    rendered: &HashMap<u64, RenderedComment>,
) -> PreparedThread {
    let thread = root
        .map(|root| reconcile(root, rendered))
        .unwrap_or_default();
    let formatted = format_thread(&thread);
    log::debug!(
        "thread {thread_id}: {} rendered, {} reconciled",
        rendered.len(),
        thread.len()
    );
    PreparedThread {
        thread_id,
        title: title.unwrap_or_default(),
        thread,
        formatted,
    }
}

pub fn fetch_thread(
    source: &ThreadSource<'_>,
    thread_id: u64,
    rendered_file: Option<&Path>,
) -> Result<PreparedThread> {
    let tree = source.fetch_tree(thread_id)?;
    let rendered = match rendered_file {
        Some(path) => load_rendered_file(path)?,
        None => source.fetch_rendered(thread_id)?,
    };
    Ok(prepare(thread_id, tree.root.as_ref(), tree.title, &rendered))
}

#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub bypass_cache: bool,
}

pub struct DigestContext<'a> {
    pub settings: &'a Settings,
    pub registry: &'a ProviderRegistry,
    pub transport: &'a dyn Transport,
    pub env_lookup: &'a dyn Fn(&str) -> Option<String>,
}

fn reject(thread_id: u64, status: Eligibility) -> SummarizeError {
    log::info!("thread {thread_id} not summarized: {status}");
    SummarizeError::EligibilityRejected(status)
}

/// Empty threads stop first; then cache, size ceiling and eligibility gate,
/// then exactly one provider call.
pub fn summarize(
    ctx: &DigestContext<'_>,
    prepared: &PreparedThread,
    opts: &SummarizeOptions,
) -> Result<SummaryResult, SummarizeError> {
    if prepared.formatted.comment_count == 0 {
        log::info!("thread {} has no reconciled comments", prepared.thread_id);
        return Err(SummarizeError::NothingToSummarize {
            thread_id: prepared.thread_id,
        });
    }

    let selection = ctx
        .settings
        .select_provider(
            ctx.registry,
            opts.provider.as_deref(),
            opts.model.as_deref(),
            ctx.env_lookup,
        )
        .map_err(|err| SummarizeError::MissingConfiguration(format!("{err:#}")))?;

    let cached = if ctx.settings.server_cache_enabled && !opts.bypass_cache {
        SummaryCache::new(ctx.transport, &ctx.settings.endpoints.cache_base)
            .get(prepared.thread_id)
    } else {
        None
    };

    if cached.is_none() {
        let count = prepared.formatted.comment_count;
        let ceiling = eligibility::check_ceiling(count, selection.spec.max_comments);
        if !ceiling.is_ok() {
            return Err(reject(prepared.thread_id, ceiling));
        }
        let status = eligibility::check(&prepared.formatted.text, count, selection.spec.class);
        if !status.is_ok() {
            return Err(reject(prepared.thread_id, status));
        }
    }

    let prompts = PromptConfig {
        customization: ctx.settings.prompt_customization,
        system: ctx.settings.system_prompt.clone(),
        user: ctx.settings.user_prompt.clone(),
    };
    let gateway = Gateway::new(ctx.registry, ctx.transport, prompts);
    let input = SummaryInput {
        provider_id: selection.spec.id,
        model_id: &selection.model,
        credential: selection.credential.as_deref(),
        base_url: Some(&selection.base_url),
        title: &prepared.title,
        text: &prepared.formatted.text,
    };
    let run = gateway.summarize(&input, cached);
    log::debug!("thread {} gateway trace: {:?}", prepared.thread_id, run.trace);
    run.result
}
