use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YOKOY_API_URL: &str = "https://app.yokoy.io/public/v1";
pub const DEFAULT_MNB_API_URL: &str = "http://www.mnb.hu/arfolyamok.asmx";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YokoyConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for YokoyConfig {
    fn default() -> Self {
        YokoyConfig {
            api_url: DEFAULT_YOKOY_API_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MnbConfig {
    pub base_url: String,
}

impl Default for MnbConfig {
    fn default() -> Self {
        MnbConfig {
            base_url: DEFAULT_MNB_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub yokoy: YokoyConfig,
    #[serde(default)]
    pub mnb: MnbConfig,
    #[serde(default)]
    pub debug: bool,
}

impl AppConfig {
    /// Resolves the configuration for a run.
    ///
    /// The file at `config_path` (or the default location, if present) is read first,
    /// then `.env` and the process environment override it.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = Self::default_config_path()?;
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("hu", "mnb-fx-sync", "mnb-fx-sync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Overrides file values with `YOKOY_API_URL`, `YOKOY_API_KEY`, `MNB_API_URL` and `DEBUG`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("YOKOY_API_URL") {
            self.yokoy.api_url = url;
        }
        if let Some(key) = lookup("YOKOY_API_KEY") {
            self.yokoy.api_key = Some(key);
        }
        if let Some(url) = lookup("MNB_API_URL") {
            self.mnb.base_url = url;
        }
        if let Some(flag) = lookup("DEBUG") {
            self.debug = flag.eq_ignore_ascii_case("true");
        }
    }

    /// True when an API key for Yokoy is present.
    pub fn is_configured(&self) -> bool {
        self.yokoy
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !self.is_configured() {
            errors.push("YOKOY_API_KEY is not set");
        }
        if self.yokoy.api_url.trim().is_empty() {
            errors.push("YOKOY_API_URL is empty");
        }

        if !errors.is_empty() {
            bail!("Configuration errors: {}", errors.join(", "));
        }
        Ok(())
    }
}
