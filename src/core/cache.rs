//! # 排盤計算快取
//!
//! 兩層：本地 LRU + TTL（同步、有上限），以及可選的跨實例鏡像層（非同步、盡力而為）。
//! 鏡像層的任何失敗都在這裡吞掉，只會變成快取未命中。

use crate::config::CacheConfig;
use crate::core::chart::element_percentages;
use crate::domain::model::{normalize_gender, BirthInput, FourPillarsChart};
use crate::domain::ports::{CacheMirror, Clock, MirrorLookup};
use crate::utils::clock::SystemClock;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 由出生資料推導快取鍵；任一必要欄位缺失或非有限數值時回傳 None（不快取）
pub fn cache_key(input: &BirthInput) -> Option<String> {
    let year = input.birth_year.as_ref()?.coerce()?;
    let month = input.birth_month.as_ref()?.coerce()?;
    let day = input.birth_day.as_ref()?.coerce()?;
    let hour = input.birth_hour.as_ref()?.coerce()?;
    let gender = normalize_gender(&input.gender)?;
    Some(format!("{}-{}-{}-{}-{}", year, month, day, hour, gender))
}

/// 失效目標：已算好的鍵，或原始出生資料
#[derive(Debug, Clone, Copy)]
pub enum CacheTarget<'a> {
    Key(&'a str),
    Input(&'a BirthInput),
}

impl<'a> From<&'a str> for CacheTarget<'a> {
    fn from(key: &'a str) -> Self {
        CacheTarget::Key(key)
    }
}

impl<'a> From<&'a BirthInput> for CacheTarget<'a> {
    fn from(input: &'a BirthInput) -> Self {
        CacheTarget::Input(input)
    }
}

impl CacheTarget<'_> {
    fn resolve(&self) -> Option<String> {
        match self {
            CacheTarget::Key(key) => Some((*key).to_string()),
            CacheTarget::Input(input) => cache_key(input),
        }
    }
}

#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    mirror_hits: AtomicU64,
    mirror_failures: AtomicU64,
    corrective_deletes: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub mirror_hits: u64,
    pub mirror_failures: u64,
    pub corrective_deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub local_entries: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

struct LocalEntry {
    value: FourPillarsChart,
    expires_at: Option<DateTime<Utc>>,
    seq: u64,
}

/// 依插入/觸碰順序排列的本地層；`order` 的最小序號即最久未使用
#[derive(Default)]
struct LocalTier {
    entries: HashMap<String, LocalEntry>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl LocalTier {
    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn remove(&mut self, key: &str) -> Option<LocalEntry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    /// 讀取並觸碰；過期項目會被移除
    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Lookup {
        let seq = self.bump_seq();
        let Some(entry) = self.entries.get_mut(key) else {
            return Lookup::Absent;
        };

        if entry.expires_at.is_some_and(|at| at <= now) {
            self.remove(key);
            return Lookup::Expired;
        }

        self.order.remove(&entry.seq);
        entry.seq = seq;
        self.order.insert(seq, key.to_string());
        Lookup::Hit(entry.value.clone())
    }

    /// 寫入後依容量淘汰最舊項目，回傳淘汰數
    fn insert(
        &mut self,
        key: &str,
        value: FourPillarsChart,
        expires_at: Option<DateTime<Utc>>,
        capacity: Option<usize>,
    ) -> usize {
        self.remove(key);
        let seq = self.bump_seq();
        self.entries.insert(
            key.to_string(),
            LocalEntry {
                value,
                expires_at,
                seq,
            },
        );
        self.order.insert(seq, key.to_string());

        let mut evicted = 0;
        if let Some(capacity) = capacity {
            while self.entries.len() > capacity {
                let Some((_, oldest)) = self.order.pop_first() else {
                    break;
                };
                self.entries.remove(&oldest);
                tracing::debug!("Evicted least recently used chart {}", oldest);
                evicted += 1;
            }
        }
        evicted
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

enum Lookup {
    Hit(FourPillarsChart),
    Expired,
    Absent,
}

/// 舊版快取值可能缺少五行百分比，讀出時補算
pub fn normalize(mut chart: FourPillarsChart) -> FourPillarsChart {
    if chart.five_element_percent.is_none() {
        chart.five_element_percent = Some(element_percentages(&chart.five_elements));
    }
    chart
}

fn has_entries(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        _ => false,
    }
}

/// 鏡像層資料的結構檢查：必須帶有非空的 `pillars` 與 `fiveElements`
pub fn is_valid_mirror_payload(value: &serde_json::Value) -> bool {
    has_entries(value.get("pillars")) && has_entries(value.get("fiveElements"))
}

pub struct CalculationCache {
    local: Mutex<LocalTier>,
    ttl: Option<Duration>,
    capacity: Option<usize>,
    mirror: Option<Arc<dyn CacheMirror>>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl CalculationCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            local: Mutex::new(LocalTier::default()),
            ttl: config.ttl(),
            capacity: config.capacity(),
            mirror: None,
            clock: Arc::new(SystemClock),
            stats: CacheStats::default(),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn CacheMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    fn lock_local(&self) -> std::sync::MutexGuard<'_, LocalTier> {
        self.local.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expiry(&self, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(ttl?).ok()?;
        Some(self.clock.now() + ttl)
    }

    fn insert_local(&self, key: &str, value: FourPillarsChart, ttl: Option<Duration>) {
        let expires_at = self.expiry(ttl);
        let evicted = self
            .lock_local()
            .insert(key, value, expires_at, self.capacity);
        if evicted > 0 {
            self.stats
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    pub async fn get(&self, key: &str) -> Option<FourPillarsChart> {
        let now = self.clock.now();
        let lookup = self.lock_local().get(key, now);
        match lookup {
            Lookup::Hit(chart) => {
                bump(&self.stats.hits);
                tracing::debug!("Chart cache hit for {}", key);
                return Some(normalize(chart));
            }
            Lookup::Expired => {
                bump(&self.stats.expirations);
                tracing::debug!("Chart cache entry {} expired", key);
            }
            Lookup::Absent => {}
        }

        let chart = self.get_from_mirror(key).await;
        if chart.is_none() {
            bump(&self.stats.misses);
        }
        chart
    }

    async fn get_from_mirror(&self, key: &str) -> Option<FourPillarsChart> {
        let mirror = self.mirror.as_ref()?;

        let value = match mirror.get(key).await {
            MirrorLookup::Hit(value) => value,
            MirrorLookup::Miss => return None,
            MirrorLookup::Failed(e) => {
                bump(&self.stats.mirror_failures);
                tracing::warn!("⚠️ Cache mirror lookup failed for {}: {}", key, e);
                return None;
            }
        };

        let chart = if is_valid_mirror_payload(&value) {
            match serde_json::from_value::<FourPillarsChart>(value) {
                Ok(chart) => Some(chart),
                Err(e) => {
                    tracing::warn!("⚠️ Cache mirror entry {} failed to decode: {}", key, e);
                    None
                }
            }
        } else {
            tracing::warn!("⚠️ Cache mirror entry {} is structurally invalid", key);
            None
        };

        let Some(chart) = chart else {
            bump(&self.stats.corrective_deletes);
            if let Err(e) = mirror.delete(key).await {
                tracing::warn!("⚠️ Corrective delete of {} failed: {}", key, e);
            }
            return None;
        };

        let chart = normalize(chart);
        bump(&self.stats.mirror_hits);
        tracing::debug!("Chart cache mirror hit for {}", key);
        self.insert_local(key, chart.clone(), self.ttl);
        Some(chart)
    }

    /// 以預設 TTL 寫入
    pub fn set(&self, key: &str, value: FourPillarsChart) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// 本地層同步寫入；鏡像層在背景寫入，不等待結果
    pub fn set_with_ttl(&self, key: &str, value: FourPillarsChart, ttl: Option<Duration>) {
        let payload = self.mirror.as_ref().map(|_| serde_json::to_value(&value));
        self.insert_local(key, value, ttl);

        let (Some(mirror), Some(payload)) = (self.mirror.clone(), payload) else {
            return;
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("⚠️ Skipping mirror write for {}: {}", key, e);
                return;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime available, skipping mirror write for {}", key);
            return;
        };

        let key = key.to_string();
        handle.spawn(async move {
            if let Err(e) = mirror.put(&key, payload, ttl).await {
                tracing::warn!("⚠️ Cache mirror write failed for {}: {}", key, e);
            }
        });
    }

    /// 同時從兩層移除；鏡像層失敗只記錄
    pub async fn invalidate<'a>(&self, target: impl Into<CacheTarget<'a>>) {
        let Some(key) = target.into().resolve() else {
            return;
        };

        self.lock_local().remove(&key);
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.delete(&key).await {
                tracing::warn!("⚠️ Cache mirror delete failed for {}: {}", key, e);
            }
        }
        tracing::debug!("Invalidated chart cache entry {}", key);
    }

    /// 清空本地層。鏡像層由所有實例共享，不在此清除
    pub fn clear(&self) {
        self.lock_local().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_local().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            hits: load(&self.stats.hits),
            misses: load(&self.stats.misses),
            mirror_hits: load(&self.stats.mirror_hits),
            mirror_failures: load(&self.stats.mirror_failures),
            corrective_deletes: load(&self.stats.corrective_deletes),
            evictions: load(&self.stats.evictions),
            expirations: load(&self.stats.expirations),
            local_entries: self.len() as u64,
        }
    }
}
