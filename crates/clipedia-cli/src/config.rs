use clipedia_core::WindowConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    pub view: Option<View>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Storage {
    /// SQLite file; `~` is expanded. Defaults to `<config>/db/clipedia.db`.
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct View {
    /// Items per fetched page (default: 50)
    pub page_size: Option<usize>,
    /// Look-ahead past the last visible row (default: 10)
    pub threshold: Option<usize>,
}

impl Settings {
    pub fn window_config(&self) -> WindowConfig {
        let defaults = WindowConfig::default();
        let view = self.view.clone().unwrap_or_default();
        WindowConfig {
            page_size: view.page_size.filter(|n| *n > 0).unwrap_or(defaults.page_size),
            threshold: view.threshold.unwrap_or(defaults.threshold),
        }
    }

    /// `--db` wins over `storage.db_path`, which wins over the default location.
    pub fn db_path(&self, cli_db: Option<PathBuf>) -> PathBuf {
        cli_db
            .or_else(|| {
                self.storage
                    .db_path
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| PathBuf::from(shellexpand::tilde(p).to_string()))
            })
            .unwrap_or_else(default_db_path)
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("clipedia")
    } else {
        PathBuf::from("./.config/clipedia")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn default_db_path() -> PathBuf {
    config_dir().join("db").join("clipedia.db")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    match std::fs::read_to_string(&path) {
        Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}
