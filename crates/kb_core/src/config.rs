use clap::Args;
use std::fmt;
use std::path::PathBuf;
use url::Url;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://help.zipboard.co";
pub const DEFAULT_BATCH_SIZE: usize = 40;

/// Settings shared by every collaborator of a run.
///
/// Built once at startup, from flags or their `KB_*` environment variables,
/// and handed to each constructor.
#[derive(Args, Clone)]
pub struct Config {
    /// Workbook holding the article catalog
    #[arg(long, env = "KB_DATA_PATH", default_value = "help_center.json")]
    pub data_path: PathBuf,

    /// Workbook receiving the gap analysis sheets
    #[arg(long, env = "KB_GAPS_PATH", default_value = "gaps_report.json")]
    pub gaps_path: PathBuf,

    /// Storage backend: workbook or memory
    #[arg(long, env = "KB_STORAGE", default_value = "workbook")]
    pub storage: String,

    /// Root of the help center to scrape
    #[arg(long, env = "KB_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Prefix of the article ids (`KB` gives `KB-1`, `KB-2`, ...)
    #[arg(long, env = "KB_ID_PREFIX", default_value = "KB")]
    pub id_prefix: String,

    /// Stop after this many articles
    #[arg(long, env = "KB_MAX_ARTICLES")]
    pub max_articles: Option<usize>,

    /// Inference backend: gemini, openai or dummy
    #[arg(long, env = "KB_MODEL", default_value = "gemini")]
    pub model: String,

    /// Model name passed to the backend
    #[arg(long, env = "KB_MODEL_NAME")]
    pub model_name: Option<String>,

    /// Base URL of the inference API
    #[arg(long, env = "KB_MODEL_URL")]
    pub model_url: Option<String>,

    #[arg(long, env = "KB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Articles sent to the model per request
    #[arg(long, env = "KB_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("help_center.json"),
            gaps_path: PathBuf::from("gaps_report.json"),
            storage: "workbook".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            id_prefix: "KB".to_string(),
            max_articles: None,
            model: "gemini".to_string(),
            model_name: None,
            model_url: None,
            api_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be > 0".to_string()));
        }
        if self.id_prefix.trim().is_empty() {
            return Err(Error::Config("id prefix must not be empty".to_string()));
        }
        if self.id_prefix.chars().any(|c| c.is_ascii_digit()) {
            return Err(Error::Config(format!("id prefix must not contain digits: {}", self.id_prefix)));
        }
        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_path", &self.data_path)
            .field("gaps_path", &self.gaps_path)
            .field("storage", &self.storage)
            .field("base_url", &self.base_url)
            .field("id_prefix", &self.id_prefix)
            .field("max_articles", &self.max_articles)
            .field("model", &self.model)
            .field("model_name", &self.model_name)
            .field("model_url", &self.model_url)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config { batch_size: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config { id_prefix: "KB1".to_string(), ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config { base_url: "not a url".to_string(), ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config { api_key: Some("secret-key".to_string()), ..Config::default() };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }
}
