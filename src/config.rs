use crate::domain::error::SchedulerError;
use serde::Deserialize;

pub const STORAGE_SQLITE: &str = "sqlite";
pub const STORAGE_MEMORY: &str = "memory";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Storage settings
    pub storage: String,
    pub db_path: String,

    // Selection settings
    pub default_limit: usize,
    pub rng_seed: Option<u64>,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: STORAGE_SQLITE.to_string(),
            db_path: "backends.db".to_string(),
            default_limit: 5,
            rng_seed: None,
            debug: false,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from an arbitrary variable lookup.
pub fn load_config_from<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let storage = lookup("SCHEDULER_STORAGE")
        .map(|v| v.trim().to_lowercase())
        .unwrap_or(defaults.storage);

    if storage != STORAGE_SQLITE && storage != STORAGE_MEMORY {
        anyhow::bail!(
            "SCHEDULER_STORAGE must be '{}' or '{}', got '{}'",
            STORAGE_SQLITE,
            STORAGE_MEMORY,
            storage
        );
    }

    let db_path = lookup("SCHEDULER_DB_PATH").unwrap_or(defaults.db_path);

    let default_limit = lookup("SCHEDULER_DEFAULT_LIMIT")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(defaults.default_limit);

    if default_limit == 0 {
        return Err(SchedulerError::InvalidLimit(0).into());
    }

    let rng_seed = lookup("SCHEDULER_RNG_SEED").and_then(|v| v.parse().ok());

    let debug = lookup("DEBUG").is_some();

    Ok(Config {
        storage,
        db_path,
        default_limit,
        rng_seed,
        debug,
    })
}
