#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::AppConfig;

use crate::utils::error::{BaziError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_MS: i64 = 6 * 60 * 60 * 1000;
pub const DEFAULT_CACHE_MAX_ENTRIES: i64 = 500;
pub const DEFAULT_MIRROR_TIMEOUT_MS: u64 = 50;
pub const DEFAULT_MIRROR_PREFIX: &str = "bazi:chart:";

/// 本地快取設定。`ttl_ms <= 0` 表示永不過期，`max_entries <= 0` 表示不限數量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
    #[serde(default = "default_max_entries")]
    pub max_entries: i64,
}

fn default_ttl_ms() -> i64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_max_entries() -> i64 {
    DEFAULT_CACHE_MAX_ENTRIES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| BaziError::InvalidConfigValueError {
                field: name.to_string(),
                value: raw.clone(),
                reason: "Value must be an integer".to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl CacheConfig {
    /// 讀取 `BAZI_CACHE_TTL_MS` 與 `BAZI_CACHE_MAX_ENTRIES`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ttl_ms: env_number("BAZI_CACHE_TTL_MS")?.unwrap_or(DEFAULT_CACHE_TTL_MS),
            max_entries: env_number("BAZI_CACHE_MAX_ENTRIES")?
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
        })
    }

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_ms > 0).then(|| Duration::from_millis(self.ttl_ms as u64))
    }

    pub fn capacity(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries as usize)
    }
}

/// 跨實例鏡像層設定；沒有 `url` 時不啟用鏡像層
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_mirror_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_mirror_prefix")]
    pub key_prefix: String,
}

fn default_mirror_timeout_ms() -> u64 {
    DEFAULT_MIRROR_TIMEOUT_MS
}

fn default_mirror_prefix() -> String {
    DEFAULT_MIRROR_PREFIX.to_string()
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: DEFAULT_MIRROR_TIMEOUT_MS,
            key_prefix: default_mirror_prefix(),
        }
    }
}

impl MirrorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("BAZI_CACHE_MIRROR_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            timeout_ms: env_number("BAZI_CACHE_MIRROR_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_MIRROR_TIMEOUT_MS),
            key_prefix: env::var("BAZI_CACHE_MIRROR_PREFIX")
                .unwrap_or_else(|_| default_mirror_prefix()),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Validate for MirrorConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            validate_url("mirror.url", url)?;
        }
        validate_range("mirror.timeout_ms", self.timeout_ms, 1, 60_000)?;
        validate_non_empty_string("mirror.key_prefix", &self.key_prefix)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_disabling_values() {
        let config = CacheConfig {
            ttl_ms: 0,
            max_entries: -5,
        };
        assert_eq!(config.ttl(), None);
        assert_eq!(config.capacity(), None);

        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Some(Duration::from_secs(6 * 60 * 60)));
        assert_eq!(config.capacity(), Some(500));
    }

    #[test]
    fn test_cache_config_from_env() {
        std::env::set_var("BAZI_CACHE_TTL_MS", "1500");
        std::env::set_var("BAZI_CACHE_MAX_ENTRIES", "-1");
        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.ttl(), Some(Duration::from_millis(1500)));
        assert_eq!(config.capacity(), None);

        std::env::set_var("BAZI_CACHE_TTL_MS", "soon");
        assert!(CacheConfig::from_env().is_err());

        std::env::remove_var("BAZI_CACHE_TTL_MS");
        std::env::remove_var("BAZI_CACHE_MAX_ENTRIES");
    }

    #[test]
    fn test_mirror_config_validation() {
        let mut config = MirrorConfig::default();
        assert!(config.validate().is_ok());

        config.url = Some("ftp://cache".to_string());
        assert!(config.validate().is_err());

        config.url = Some("http://cache.internal:8080".to_string());
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
