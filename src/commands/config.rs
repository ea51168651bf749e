use anyhow::{Context, Result};

use crate::commands::CommandReport;
use crate::digest::paths::resolve_paths;
use crate::digest::providers::ProviderRegistry;
use crate::digest::settings::{SettingsStore, apply_env_overrides, process_env, validate};

#[derive(Debug, Clone)]
pub enum ConfigAction {
    Show,
    Set { key: String, value: String },
    Path,
}

pub fn run(action: &ConfigAction) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let store = SettingsStore::from_paths(&paths);
    let registry = ProviderRegistry::builtin();
    let mut report = CommandReport::new("config");

    match action {
        ConfigAction::Path => {
            report.detail(format!("home={}", paths.home.display()));
            report.output(store.path().display().to_string());
        }
        ConfigAction::Show => {
            let mut settings = store.get()?;
            apply_env_overrides(&mut settings, &process_env);
            if let Err(err) = validate(&settings, &registry) {
                report.issue(format!("{err:#}"));
            }
            report.detail(format!("provider={}", settings.provider_id()));
            report.detail(format!("providers={}", registry.ids().join(",")));
            let rendered = toml::to_string_pretty(&settings.redacted())
                .context("failed to render settings")?;
            report.output(rendered);
        }
        ConfigAction::Set { key, value } => {
            let mut settings = store.get()?;
            settings.set_key(key, value)?;
            validate(&settings, &registry)?;
            store.set(&settings)?;
            report.detail(format!("updated {}", key.trim()));
            report.detail(format!("settings_file={}", store.path().display()));
        }
    }
    Ok(report)
}
