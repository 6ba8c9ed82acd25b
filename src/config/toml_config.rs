use crate::config::{CacheConfig, MirrorConfig};
use crate::utils::error::{BaziError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_path, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub locations: LocationsConfig,
}

/// 曆法服務：`endpoint`（HTTP）或 `file`（預先計算好的 JSON）擇一
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub endpoint: Option<String>,
    pub file: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationsConfig {
    pub csv_path: Option<String>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BaziError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BaziError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 環境變數載入，欄位未設定時使用預設值
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cache: CacheConfig::from_env()?,
            mirror: MirrorConfig::from_env()?,
            calendar: CalendarConfig {
                endpoint: std::env::var("BAZI_CALENDAR_ENDPOINT").ok(),
                file: None,
                timeout_seconds: None,
            },
            locations: LocationsConfig {
                csv_path: std::env::var("BAZI_LOCATIONS_CSV").ok(),
            },
        })
    }

    /// 替換環境變數 (例如 ${MIRROR_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BaziError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn calendar_timeout_seconds(&self) -> u64 {
        self.calendar.timeout_seconds.unwrap_or(10)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.mirror.validate()?;

        match (&self.calendar.endpoint, &self.calendar.file) {
            (Some(_), Some(_)) => {
                return Err(BaziError::ConfigValidationError {
                    field: "calendar".to_string(),
                    message: "Set either calendar.endpoint or calendar.file, not both"
                        .to_string(),
                })
            }
            (Some(endpoint), None) => validate_url("calendar.endpoint", endpoint)?,
            (None, Some(file)) => {
                validate_path("calendar.file", file)?;
                validate_file_extension("calendar.file", file, &["json"])?;
            }
            (None, None) => {}
        }

        if let Some(timeout) = self.calendar.timeout_seconds {
            validate_range("calendar.timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(csv_path) = &self.locations.csv_path {
            validate_path("locations.csv_path", csv_path)?;
            validate_file_extension("locations.csv_path", csv_path, &["csv"])?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[cache]
ttl_ms = 60000
max_entries = 100

[mirror]
url = "http://mirror.internal:8080"
timeout_ms = 25

[calendar]
endpoint = "https://calendar.example.com/sexagenary"

[locations]
csv_path = "./cities.csv"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(60)));
        assert_eq!(config.cache.capacity(), Some(100));
        assert_eq!(config.mirror.timeout(), Duration::from_millis(25));
        assert_eq!(config.mirror.key_prefix, "bazi:chart:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.cache, CacheConfig::default());
        assert!(config.mirror.url.is_none());
        assert_eq!(config.calendar_timeout_seconds(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_BAZI_MIRROR_URL", "http://mirror.test:9000");

        let toml_content = r#"
[mirror]
url = "${TEST_BAZI_MIRROR_URL}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.mirror.url.as_deref(), Some("http://mirror.test:9000"));

        std::env::remove_var("TEST_BAZI_MIRROR_URL");
    }

    #[test]
    fn test_config_validation() {
        let both = r#"
[calendar]
endpoint = "https://calendar.example.com"
file = "./calendar.json"
"#;
        assert!(AppConfig::from_toml_str(both).unwrap().validate().is_err());

        let bad_csv = r#"
[locations]
csv_path = "./cities.xlsx"
"#;
        assert!(AppConfig::from_toml_str(bad_csv).unwrap().validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[cache]
ttl_ms = 0
max_entries = 0
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.cache.ttl(), None);
        assert_eq!(config.cache.capacity(), None);
    }
}
