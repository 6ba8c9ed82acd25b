use crate::domain::model::{CalendarOutput, Location, NormalizedBirth};
use crate::utils::error::{MirrorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// 農曆/干支曆法服務：由西曆出生時刻換算四柱八字元與大運序列
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn sexagenary(&self, birth: &NormalizedBirth) -> Result<CalendarOutput>;
}

/// 地點解析服務：自由文字 → 經緯度
pub trait LocationResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Option<Location>;
}

/// 鏡像層查詢結果
#[derive(Debug)]
pub enum MirrorLookup {
    Hit(serde_json::Value),
    Miss,
    Failed(MirrorError),
}

/// 跨實例共享的快取鏡像層，盡力而為
#[async_trait]
pub trait CacheMirror: Send + Sync {
    async fn get(&self, key: &str) -> MirrorLookup;
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), MirrorError>;
    async fn delete(&self, key: &str) -> std::result::Result<(), MirrorError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
