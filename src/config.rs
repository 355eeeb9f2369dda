// src/config.rs

//! Configuration discovery and loading.
//!
//! The configuration file is looked up in this order:
//!
//! 1. an explicit path (the `--config` flag)
//! 2. the `NEWS_CRAWLERS_CONFIG` environment variable
//! 3. `./news_crawlers.toml`
//! 4. `$HOME/news_crawlers.toml`

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "NEWS_CRAWLERS_CONFIG";

/// Default configuration file name.
pub const CONFIG_FILE: &str = "news_crawlers.toml";

/// Find the configuration file to use.
pub fn find_config(explicit: Option<&Path>) -> Result<PathBuf> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    locate(explicit, from_env, &default_candidates(home))
}

/// Find, load and validate the configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config)> {
    let path = find_config(explicit)?;
    log::debug!("Loading configuration from {}", path.display());

    let config = Config::load(&path)
        .map_err(|e| AppError::config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok((path, config))
}

fn default_candidates(home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(home) = home {
        candidates.push(home.join(CONFIG_FILE));
    }
    candidates
}

/// Explicit and environment paths must exist; defaults are probed in order.
fn locate(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    candidates: &[PathBuf],
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return existing(path.to_path_buf(), "--config");
    }
    if let Some(path) = from_env {
        return existing(path, CONFIG_ENV);
    }

    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            AppError::config(format!(
                "no configuration found (tried {})",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

fn existing(path: PathBuf, source: &str) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(AppError::config(format!(
            "configuration file {} (from {source}) does not exist",
            path.display()
        )))
    }
}
