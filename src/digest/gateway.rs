use crate::digest::cache::CachedSummary;
use crate::digest::profiles;
use crate::digest::providers::{ProviderRegistry, ProviderRequest, ProviderSpec, RequiredField};
use crate::digest::transport::{Transport, TransportError};
use crate::error::SummarizeError;
use serde::Serialize;

const TOKENS_PER_CHAR: f64 = 0.25;
const TITLE_PLACEHOLDER: &str = "${title}";
const TEXT_PLACEHOLDER: &str = "${text}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You summarize online discussion threads for busy readers.

Each line of the thread is one comment in this form:
[path] (score: N) <replies: N> {downvotes: N} author: text

- [path] is the comment's position in the tree: [2] is the second top-level comment, [2.1] its first reply.
- score (0-1000) reflects how highly the community ranked the comment; weigh high scores more.
- replies counts direct replies; many replies mark a point of contention or interest.
- downvotes (0-9) measures how strongly the comment was downvoted; treat heavily downvoted comments with skepticism.

Write the summary in markdown:
1. An overview of the discussion in two or three sentences.
2. The main themes, each with a short explanation and the key viewpoints.
3. Notable disagreements or unresolved questions.

Whenever you mention a specific comment, cite it with its path in square brackets, for example [1.2], followed by the author in parentheses. Quote sparingly and never invent paths that are not in the thread.";

pub const DEFAULT_USER_TEMPLATE: &str = "Summarize the discussion below about the post titled \"${title}\".

${text}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GatewayState {
    Idle,
    Validating,
    ShortCircuited,
    Requesting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    pub customization: bool,
    pub system: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SummaryInput<'a> {
    pub provider_id: &'a str,
    pub model_id: &'a str,
    pub credential: Option<&'a str>,
    pub base_url: Option<&'a str>,
    pub title: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SummarySource {
    Provider,
    Cache { created_at: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub provider_id: String,
    pub model_id: String,
    pub summary: String,
    pub source: SummarySource,
    pub truncated: bool,
    pub estimated_input_tokens: usize,
}

#[derive(Debug)]
pub struct SummaryRun {
    pub trace: Vec<GatewayState>,
    pub result: Result<SummaryResult, SummarizeError>,
}

impl SummaryRun {
    pub fn state(&self) -> GatewayState {
        self.trace.last().copied().unwrap_or(GatewayState::Idle)
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    ((text.chars().count() as f64) * TOKENS_PER_CHAR).ceil() as usize
}

/// Keep whole lines from the start while the estimate stays within
/// `budget_tokens`. Returns the kept text and whether anything was dropped.
pub fn truncate_to_budget(text: &str, budget_tokens: usize) -> (String, bool) {
    let mut kept = String::new();
    let mut kept_chars = 0usize;
    for line in text.split_inclusive('\n') {
        let next_chars = kept_chars + line.chars().count();
        if ((next_chars as f64) * TOKENS_PER_CHAR).ceil() as usize > budget_tokens {
            return (kept, true);
        }
        kept.push_str(line);
        kept_chars = next_chars;
    }
    (kept, false)
}

/// Literal, single-pass placeholder substitution: inserted values are never
/// rescanned.
pub fn fill_template(template: &str, title: &str, text: &str) -> String {
    let mut out = String::with_capacity(template.len() + text.len() + title.len());
    let mut rest = template;
    loop {
        let next_title = rest.find(TITLE_PLACEHOLDER);
        let next_text = rest.find(TEXT_PLACEHOLDER);
        let (idx, placeholder, value) = match (next_title, next_text) {
            (Some(a), Some(b)) if a < b => (a, TITLE_PLACEHOLDER, title),
            (Some(a), None) => (a, TITLE_PLACEHOLDER, title),
            (_, Some(b)) => (b, TEXT_PLACEHOLDER, text),
            (None, None) => break,
        };
        out.push_str(&rest[..idx]);
        out.push_str(value);
        rest = &rest[idx + placeholder.len()..];
    }
    out.push_str(rest);
    out
}

fn custom_or_default<'p>(custom: Option<&'p str>, fallback: &'p str) -> &'p str {
    custom.filter(|t| !t.trim().is_empty()).unwrap_or(fallback)
}

pub fn build_prompts(config: &PromptConfig, title: &str, text: &str) -> (String, String) {
    let (system, user) = if config.customization {
        (
            custom_or_default(config.system.as_deref(), DEFAULT_SYSTEM_PROMPT),
            custom_or_default(config.user.as_deref(), DEFAULT_USER_TEMPLATE),
        )
    } else {
        (DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_TEMPLATE)
    };
    (system.to_string(), fill_template(user, title, text))
}

pub fn classify_error(message: &str) -> SummarizeError {
    let lower = message.to_ascii_lowercase();
    let detail = message.trim().to_string();
    if lower.contains("current quota") || lower.contains("insufficient_quota") {
        return SummarizeError::QuotaExceeded(detail);
    }
    if lower.contains("429") || lower.contains("rate limit") {
        return SummarizeError::RateLimited(detail);
    }
    if message.contains("API key") || lower.contains("api_key") {
        return SummarizeError::MissingConfiguration(format!("API key rejected: {detail}"));
    }
    if lower.contains("connection refused")
        || lower.contains("connection failed")
        || lower.contains("error sending request")
        || lower.contains("failed to fetch")
        || lower.contains("dns error")
    {
        return SummarizeError::TransportFailure(detail);
    }
    SummarizeError::Unclassified(detail)
}

fn map_transport_error(err: TransportError) -> SummarizeError {
    match err {
        TransportError::Timeout { .. } => SummarizeError::Timeout(err.to_string()),
        TransportError::Status { status, ref body } => classify_error(&format!("{status} {body}")),
        TransportError::Network(_) => classify_error(&err.to_string()),
        TransportError::Decode(_) => SummarizeError::TransportFailure(err.to_string()),
    }
}

pub struct Gateway<'a> {
    registry: &'a ProviderRegistry,
    transport: &'a dyn Transport,
    prompts: PromptConfig,
}

fn missing(field: &str) -> SummarizeError {
    SummarizeError::MissingConfiguration(format!("{field} is not set"))
}

impl<'a> Gateway<'a> {
    pub fn new(
        registry: &'a ProviderRegistry,
        transport: &'a dyn Transport,
        prompts: PromptConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            prompts,
        }
    }

    fn validate(
        &self,
        input: &SummaryInput<'_>,
    ) -> Result<&'static ProviderSpec, SummarizeError> {
        let provider_id = input.provider_id.trim();
        if provider_id.is_empty() {
            return Err(missing("provider"));
        }
        let spec = self.registry.get(provider_id).ok_or_else(|| {
            SummarizeError::MissingConfiguration(format!("unknown provider `{provider_id}`"))
        })?;
        if spec.requires(RequiredField::Text) && input.text.trim().is_empty() {
            return Err(missing("thread text"));
        }
        if spec.requires(RequiredField::Model) && input.model_id.trim().is_empty() {
            return Err(missing("model"));
        }
        if spec.requires(RequiredField::Credential)
            && input.credential.is_none_or(|c| c.trim().is_empty())
        {
            return Err(missing(&format!("{} API key", spec.label)));
        }
        Ok(spec)
    }

    fn request(
        &self,
        spec: &ProviderSpec,
        input: &SummaryInput<'_>,
    ) -> Result<SummaryResult, SummarizeError> {
        let model_id = input.model_id.trim();
        let profile = profiles::lookup(spec.id, model_id);
        let (text, truncated) = truncate_to_budget(input.text, profile.input_token_budget);
        if truncated && text.trim().is_empty() {
            return Err(SummarizeError::Unclassified(format!(
                "the first comment alone exceeds the {} input budget of {} tokens for {model_id}",
                spec.label, profile.input_token_budget
            )));
        }
        if truncated {
            log::info!(
                "thread text truncated to {} of {} estimated tokens for {}/{model_id}",
                estimate_tokens(&text),
                estimate_tokens(input.text),
                spec.id,
            );
        }
        let (system_prompt, user_prompt) = build_prompts(&self.prompts, input.title, &text);
        let request = ProviderRequest {
            provider_id: spec.id.to_string(),
            model_id: model_id.to_string(),
            credential: input.credential.map(|c| c.trim().to_string()),
            system_prompt,
            user_prompt,
            parameters: (spec.parameters)(&profile),
        };
        let base_url = input.base_url.unwrap_or(spec.default_base_url);
        let http = (spec.build_request)(&request, base_url);

        let json = self
            .transport
            .send_json(&http)
            .map_err(map_transport_error)?
            .ok_or_else(|| {
                SummarizeError::Unclassified(format!("{} endpoint not found", spec.label))
            })?;

        let summary = (spec.parse_response)(&json)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if summary.is_empty() {
            return Err(SummarizeError::EmptySummary {
                provider: spec.label.to_string(),
            });
        }

        Ok(SummaryResult {
            provider_id: spec.id.to_string(),
            model_id: request.model_id,
            summary,
            source: SummarySource::Provider,
            truncated,
            estimated_input_tokens: estimate_tokens(&text),
        })
    }

    /// Run one call: a cached summary short-circuits the provider, otherwise
    /// exactly one request is sent. No retries.
    pub fn summarize(&self, input: &SummaryInput<'_>, cached: Option<CachedSummary>) -> SummaryRun {
        let mut trace = vec![GatewayState::Idle, GatewayState::Validating];

        if let Some(cached) = cached {
            trace.push(GatewayState::ShortCircuited);
            trace.push(GatewayState::Succeeded);
            return SummaryRun {
                trace,
                result: Ok(SummaryResult {
                    provider_id: "cache".to_string(),
                    model_id: String::new(),
                    summary: cached.summary,
                    source: SummarySource::Cache {
                        created_at: cached.created_at,
                    },
                    truncated: false,
                    estimated_input_tokens: 0,
                }),
            };
        }

        let spec = match self.validate(input) {
            Ok(spec) => spec,
            Err(err) => {
                trace.push(GatewayState::Failed);
                return SummaryRun {
                    trace,
                    result: Err(err),
                };
            }
        };

        trace.push(GatewayState::Requesting);
        log::debug!("requesting summary from {}/{}", spec.id, input.model_id.trim());
        let result = self.request(spec, input);
        match &result {
            Ok(_) => trace.push(GatewayState::Succeeded),
            Err(err) => {
                log::warn!("summary request to {} failed: {err}", spec.id);
                trace.push(GatewayState::Failed);
            }
        }
        SummaryRun { trace, result }
    }
}
