use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DigestPaths {
    pub home: PathBuf,
    pub settings_file: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

fn default_home() -> Result<PathBuf> {
    if let Some(config) = dirs::config_dir() {
        return Ok(config.join("thread-digest"));
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".thread-digest"));
    }
    Err(anyhow::anyhow!("config directory could not be resolved"))
}

pub fn home_from_env() -> Option<PathBuf> {
    match env::var("THREAD_DIGEST_HOME") {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

pub fn resolve_paths() -> Result<DigestPaths> {
    let home = match home_from_env() {
        Some(home) => home,
        None => default_home()?,
    };
    let settings_file =
        env_or_default_path("THREAD_DIGEST_SETTINGS_FILE", home.join("settings.toml"));
    Ok(DigestPaths {
        home,
        settings_file,
    })
}
