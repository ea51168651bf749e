use crate::digest::paths::DigestPaths;
use crate::digest::providers::{ProviderRegistry, ProviderSpec};
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://hn.algolia.com/api/v1";
pub const DEFAULT_SITE_BASE: &str = "https://news.ycombinator.com";
pub const DEFAULT_CACHE_BASE: &str = "https://app.hncompanion.com/api";
pub const DEFAULT_USER_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
pub const DEFAULT_PROVIDER: &str = "openai";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub api_base: String,
    pub site_base: String,
    pub cache_base: String,
    pub user_api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            site_base: DEFAULT_SITE_BASE.to_string(),
            cache_base: DEFAULT_CACHE_BASE.to_string(),
            user_api_base: DEFAULT_USER_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_cache_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_selection: Option<String>,
    pub prompt_customization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    pub providers: BTreeMap<String, ProviderSettings>,
    pub endpoints: Endpoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_cache_enabled: true,
            provider_selection: None,
            prompt_customization: false,
            system_prompt: None,
            user_prompt: None,
            providers: BTreeMap::new(),
            endpoints: Endpoints::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSelection {
    pub spec: &'static ProviderSpec,
    pub model: String,
    pub credential: Option<String>,
    pub base_url: String,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Settings {
    pub fn provider_id(&self) -> String {
        non_empty(self.provider_selection.as_deref())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    pub fn provider(&self, id: &str) -> ProviderSettings {
        self.providers.get(id).cloned().unwrap_or_default()
    }

    /// Resolve what to call. Missing credentials are left as `None` for the
    /// gateway's validation to reject.
    pub fn select_provider(
        &self,
        registry: &ProviderRegistry,
        provider_override: Option<&str>,
        model_override: Option<&str>,
        env_lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ProviderSelection> {
        let id = non_empty(provider_override).unwrap_or_else(|| self.provider_id());
        let spec = registry.get(&id).ok_or_else(|| {
            anyhow!(
                "unknown provider `{id}`; choose one of {}",
                registry.ids().join(", ")
            )
        })?;
        let stored = self.provider(spec.id);
        let model = non_empty(model_override)
            .or_else(|| non_empty(stored.model.as_deref()))
            .unwrap_or_else(|| spec.default_model.to_string());
        let credential = non_empty(stored.api_key.as_deref()).or_else(|| {
            spec.credential_env
                .and_then(|var| non_empty(env_lookup(var).as_deref()))
        });
        let base_url = non_empty(stored.base_url.as_deref())
            .unwrap_or_else(|| spec.default_base_url.to_string());
        Ok(ProviderSelection {
            spec,
            model,
            credential,
            base_url,
        })
    }

    /// Update one dotted key, e.g. `provider`, `openai.api_key`, `endpoints.site_base`.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional = || non_empty(Some(value));
        match key.trim() {
            "server_cache_enabled" | "server_cache" => {
                self.server_cache_enabled = parse_bool(value)?
            }
            "provider" | "provider_selection" => self.provider_selection = optional(),
            "prompt_customization" => self.prompt_customization = parse_bool(value)?,
            "system_prompt" => self.system_prompt = optional(),
            "user_prompt" => self.user_prompt = optional(),
            "endpoints.api_base" => self.endpoints.api_base = value.to_string(),
            "endpoints.site_base" => self.endpoints.site_base = value.to_string(),
            "endpoints.cache_base" => self.endpoints.cache_base = value.to_string(),
            "endpoints.user_api_base" => self.endpoints.user_api_base = value.to_string(),
            other => {
                let Some((provider, field)) = other.split_once('.') else {
                    bail!("unknown settings key `{other}`");
                };
                let entry = self
                    .providers
                    .entry(provider.trim().to_ascii_lowercase())
                    .or_default();
                match field {
                    "api_key" => entry.api_key = optional(),
                    "model" => entry.model = optional(),
                    "base_url" => entry.base_url = optional(),
                    _ => bail!("unknown provider settings field `{field}`"),
                }
            }
        }
        Ok(())
    }

    pub fn redacted(&self) -> Settings {
        let mut out = self.clone();
        for provider in out.providers.values_mut() {
            if let Some(key) = provider.api_key.as_mut() {
                let tail: String = key
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                *key = format!("****{tail}");
            }
        }
        out
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "on" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got `{other}`"),
    }
}

fn env_or_bool(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: bool) -> bool {
    match lookup(var) {
        Some(v) => parse_bool(&v).unwrap_or(fallback),
        None => fallback,
    }
}

fn env_or_string(lookup: &dyn Fn(&str) -> Option<String>, var: &str, fallback: &str) -> String {
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn process_env(var: &str) -> Option<String> {
    env::var(var).ok()
}

/// Environment overrides layered over the stored record; never persisted.
pub fn apply_env_overrides(settings: &mut Settings, lookup: &dyn Fn(&str) -> Option<String>) {
    settings.server_cache_enabled = env_or_bool(
        lookup,
        "THREAD_DIGEST_SERVER_CACHE",
        settings.server_cache_enabled,
    );
    if let Some(provider) = non_empty(lookup("THREAD_DIGEST_PROVIDER").as_deref()) {
        settings.provider_selection = Some(provider);
    }
    if let Some(model) = non_empty(lookup("THREAD_DIGEST_MODEL").as_deref()) {
        let id = settings.provider_id();
        settings.providers.entry(id).or_default().model = Some(model);
    }
    let endpoints = &mut settings.endpoints;
    endpoints.api_base = env_or_string(lookup, "THREAD_DIGEST_API_BASE", &endpoints.api_base);
    endpoints.site_base = env_or_string(lookup, "THREAD_DIGEST_SITE_BASE", &endpoints.site_base);
    endpoints.cache_base = env_or_string(lookup, "THREAD_DIGEST_CACHE_BASE", &endpoints.cache_base);
    endpoints.user_api_base = env_or_string(
        lookup,
        "THREAD_DIGEST_USER_API_BASE",
        &endpoints.user_api_base,
    );
}

fn is_http_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

pub fn validate(settings: &Settings, registry: &ProviderRegistry) -> Result<()> {
    if let Some(selected) = non_empty(settings.provider_selection.as_deref())
        && registry.get(&selected).is_none()
    {
        bail!(
            "invalid provider selection `{selected}`; choose one of {}",
            registry.ids().join(", ")
        );
    }
    let endpoints = &settings.endpoints;
    for (name, url) in [
        ("api_base", &endpoints.api_base),
        ("site_base", &endpoints.site_base),
        ("cache_base", &endpoints.cache_base),
        ("user_api_base", &endpoints.user_api_base),
    ] {
        if !is_http_url(url) {
            bail!("invalid endpoints.{name}: `{url}` must be an http(s) URL");
        }
    }
    for (id, provider) in &settings.providers {
        if let Some(base) = provider.base_url.as_deref()
            && !is_http_url(base)
        {
            bail!("invalid {id}.base_url: `{base}` must be an http(s) URL");
        }
    }
    Ok(())
}

/// Single-record settings store; `set` overwrites the whole record.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_paths(paths: &DigestPaths) -> Self {
        Self::new(paths.settings_file.clone())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn get(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings {}", self.path.display()))
    }

    pub fn set(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = toml::to_string_pretty(settings)?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

pub fn load_effective(store: &SettingsStore, registry: &ProviderRegistry) -> Result<Settings> {
    let mut settings = store.get()?;
    apply_env_overrides(&mut settings, &process_env);
    validate(&settings, registry)?;
    Ok(settings)
}
