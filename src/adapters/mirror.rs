use crate::config::MirrorConfig;
use crate::domain::ports::{CacheMirror, MirrorLookup};
use crate::utils::error::{BaziError, MirrorError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

struct MirrorEntry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

/// 行程內共享的鏡像層；單節點部署與測試使用
#[derive(Default)]
pub struct InMemoryMirror {
    entries: Mutex<HashMap<String, MirrorEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MirrorEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 直接寫入任意資料，不經過快取（用於模擬其他實例或舊版寫入的內容）
    pub fn insert_raw(&self, key: &str, value: serde_json::Value) {
        self.lock().insert(
            key.to_string(),
            MirrorEntry {
                value,
                expires_at: None,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 模擬鏡像層離線：所有操作都回傳傳輸錯誤
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    fn check_available(&self) -> std::result::Result<(), MirrorError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(MirrorError::Transport("mirror offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheMirror for InMemoryMirror {
    async fn get(&self, key: &str) -> MirrorLookup {
        if let Err(e) = self.check_available() {
            return MirrorLookup::Failed(e);
        }

        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Instant::now()),
            None => return MirrorLookup::Miss,
        };
        if expired {
            entries.remove(key);
            return MirrorLookup::Miss;
        }
        entries
            .get(key)
            .map(|entry| MirrorLookup::Hit(entry.value.clone()))
            .unwrap_or(MirrorLookup::Miss)
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), MirrorError> {
        self.check_available()?;
        self.lock().insert(
            key.to_string(),
            MirrorEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), MirrorError> {
        self.check_available()?;
        self.lock().remove(key);
        Ok(())
    }
}

/// 以 HTTP 鍵值服務作為鏡像層：`GET/PUT/DELETE {base}/{prefix}{key}`。
///
/// PUT 時以 `ttl_ms` 查詢參數帶上存活時間；404 視為未命中。
pub struct HttpMirror {
    client: Client,
    base: Url,
    prefix: String,
    timeout: Duration,
}

impl HttpMirror {
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| BaziError::MissingConfigError {
                field: "mirror.url".to_string(),
            })?;
        let base = Url::parse(raw).map_err(|e| BaziError::InvalidConfigValueError {
            field: "mirror.url".to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(BaziError::InvalidConfigValueError {
                field: "mirror.url".to_string(),
                value: raw.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base,
            prefix: config.key_prefix.clone(),
            timeout: config.timeout(),
        })
    }

    fn entry_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{}{}", self.prefix, key));
        }
        url
    }

    fn map_error(&self, e: reqwest::Error) -> MirrorError {
        if e.is_timeout() {
            MirrorError::Timeout(self.timeout.as_millis() as u64)
        } else {
            MirrorError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl CacheMirror for HttpMirror {
    async fn get(&self, key: &str) -> MirrorLookup {
        let response = match self.client.get(self.entry_url(key)).send().await {
            Ok(response) => response,
            Err(e) => return MirrorLookup::Failed(self.map_error(e)),
        };

        match response.status() {
            StatusCode::NOT_FOUND => MirrorLookup::Miss,
            status if status.is_success() => match response.json::<serde_json::Value>().await {
                Ok(value) => MirrorLookup::Hit(value),
                Err(e) => MirrorLookup::Failed(MirrorError::Payload(e.to_string())),
            },
            status => MirrorLookup::Failed(MirrorError::Status(status.as_u16())),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), MirrorError> {
        let mut request = self.client.put(self.entry_url(key)).json(&value);
        if let Some(ttl) = ttl {
            request = request.query(&[("ttl_ms", ttl.as_millis().to_string())]);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(MirrorError::Status(response.status().as_u16()))
        }
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), MirrorError> {
        let response = self
            .client
            .delete(self.entry_url(key))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        match response.status() {
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            status => Err(MirrorError::Status(status.as_u16())),
        }
    }
}
