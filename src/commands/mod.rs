pub mod cache;
pub mod config;
pub mod format;
pub mod links;
pub mod summarize;
pub mod user;

use anyhow::Result;
use serde::Serialize;

use crate::digest::paths::resolve_paths;
use crate::digest::providers::ProviderRegistry;
use crate::digest::settings::{Settings, SettingsStore, load_effective};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    /// Primary payload (summary, formatted thread, settings); printed last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            output: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn output(&mut self, text: impl Into<String>) {
        self.output = Some(text.into());
    }
}

/// Effective settings (stored record, env overrides, validated) for commands
/// that talk to the network.
pub fn effective_settings(registry: &ProviderRegistry) -> Result<Settings> {
    let paths = resolve_paths()?;
    load_effective(&SettingsStore::from_paths(&paths), registry)
}
