use crate::utils::error::{Result, ShippingError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.collivery.co.za/v3";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingConfig {
    #[serde(default)]
    pub collivery: ColliveryConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliveryConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub app_name: Option<String>,
}

impl Default for ColliveryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_seconds: None,
            app_name: None,
        }
    }
}

impl ColliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub settings_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            settings_path: "./mds_collivery_settings.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub directory: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./cache/mds_collivery".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl ShippingConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShippingError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShippingError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MDS_API_BASE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShippingError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for ShippingConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("collivery.base_url", &self.collivery.base_url)?;
        validation::validate_path("store.settings_path", &self.store.settings_path)?;
        validation::validate_path("log.directory", &self.log.directory)?;

        if let Some(timeout) = self.collivery.timeout_seconds {
            validation::validate_range("collivery.timeout_seconds", timeout, 1, 300)?;
        }
        if let Some(app_name) = &self.collivery.app_name {
            validation::validate_non_empty_string("collivery.app_name", app_name)?;
        }

        Ok(())
    }
}
