use serde_derive::{Deserialize, Serialize};

/// Persisted CLI configuration, loaded via `confy` from the platform config
/// directory (`niwa/config.toml`). Per-invocation flags always take
/// precedence over values read from here.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigLoad {
    version: u8,

    /// Default agent identifier used when `--agent` and `NIWA_AGENT` are
    /// both absent.
    pub default_agent: Option<String>,

    /// Directory the store lives under, relative to the working directory.
    pub store_dir: Option<String>,

    /// Log verbosity passed to `trace::init_logging`.
    pub log_level: Option<String>,

    /// Whether to colorize terminal and log output. Defaults to `true`.
    pub color: Option<bool>,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            version: 1,
            default_agent: None,
            store_dir: Some(".niwa".to_string()),
            log_level: Some("info".to_string()),
            color: Some(true),
        }
    }
}

impl ConfigLoad {
    pub fn load() -> Self {
        confy::load("niwa", "config").unwrap_or_else(|err| {
            log::warn!("failed to load config, using defaults: {}", err);
            ConfigLoad::default()
        })
    }

    pub fn store_dir(&self) -> String {
        self.store_dir.clone().unwrap_or_else(|| ".niwa".to_string())
    }

    pub fn log_level(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| "info".to_string())
    }

    pub fn color(&self) -> bool {
        self.color.unwrap_or(true)
    }
}