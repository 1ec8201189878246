use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::summary::SummaryOptions;

/// Environment variables consulted for the reasoning-service key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Application settings
///
/// Every field has a default, so a partial (or missing) file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locale for both speech recognition and synthesis
    pub locale: String,
    /// Generative model used by the assistant
    pub model: String,
    pub api_base_url: String,
    /// Per-request timeout; requests wait indefinitely when unset
    pub request_timeout_secs: Option<u64>,
    pub recent_transaction_limit: usize,
    pub product_listing_limit: usize,
    /// How many ledger entries the anomaly audit looks at
    pub anomaly_transaction_limit: usize,
    pub speech_rate: f32,
    pub speech_pitch: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "id-ID".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: None,
            recent_transaction_limit: 5,
            product_listing_limit: 50,
            anomaly_transaction_limit: 30,
            speech_rate: 1.05,
            speech_pitch: 1.0,
        }
    }
}

impl Config {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            recent_transactions: self.recent_transaction_limit,
            product_listing: self.product_listing_limit,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// First non-empty API key found in the environment
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

/// Gets the path to the configuration file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if NEXRETAIL_CONFIG environment variable is set
    if let Ok(path) = std::env::var("NEXRETAIL_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.nexretail.yaml
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".nexretail.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.locale, "id-ID");
        assert_eq!(config.recent_transaction_limit, 5);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.summary_options(), SummaryOptions::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_or_default(dir.path().join("absent.yaml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nexretail.yaml");
        fs::write(&path, "locale: en-US\nrequest_timeout_secs: 20\n")?;

        let config = Config::load(&path)?;
        assert_eq!(config.locale, "en-US");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.model, "gemini-2.5-flash");
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config {
            anomaly_transaction_limit: 10,
            ..Config::default()
        };
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }
}
