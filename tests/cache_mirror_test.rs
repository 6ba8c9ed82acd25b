use anyhow::Result;
use bazi_core::core::cache::CalculationCache;
use bazi_core::core::chart::assemble;
use bazi_core::domain::model::{CalendarOutput, FourPillarsChart, GanZhi};
use bazi_core::domain::ports::CacheMirror;
use bazi_core::{CacheConfig, InMemoryMirror};
use std::sync::Arc;
use std::time::Duration;

fn gz(stem: &str, branch: &str) -> GanZhi {
    GanZhi {
        stem: stem.to_string(),
        branch: branch.to_string(),
    }
}

fn sample_chart() -> Result<FourPillarsChart> {
    let output = CalendarOutput {
        year: gz("庚", "午"),
        month: gz("辛", "巳"),
        day: gz("辛", "亥"),
        hour: gz("乙", "未"),
        luck_sequence: vec![],
    };
    Ok(assemble(&output)?)
}

fn cache_with(mirror: Arc<InMemoryMirror>) -> CalculationCache {
    CalculationCache::new(&CacheConfig::default()).with_mirror(mirror)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_set_writes_through_to_mirror() -> Result<()> {
    let mirror = Arc::new(InMemoryMirror::new());
    let cache = cache_with(mirror.clone());

    cache.set("1990-5-20-14-male", sample_chart()?);
    settle().await;

    assert!(mirror.contains("1990-5-20-14-male"));
    Ok(())
}

#[tokio::test]
async fn test_mirror_hit_populates_local_tier() -> Result<()> {
    let mirror = Arc::new(InMemoryMirror::new());
    let chart = sample_chart()?;

    // 另一個實例寫入的結果
    let writer = cache_with(mirror.clone());
    writer.set("k", chart.clone());
    settle().await;

    let reader = cache_with(mirror.clone());
    assert!(reader.is_empty());

    let found = reader.get("k").await;
    assert_eq!(found, Some(chart));
    assert_eq!(reader.len(), 1);
    assert_eq!(reader.stats().mirror_hits, 1);

    // 第二次直接命中本地層
    reader.get("k").await;
    assert_eq!(reader.stats().hits, 1);
    assert_eq!(reader.stats().mirror_hits, 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_mirror_payload_is_deleted() -> Result<()> {
    let mirror = Arc::new(InMemoryMirror::new());
    mirror.insert_raw("broken", serde_json::json!({"pillars": {}, "fiveElements": {}}));
    mirror.insert_raw("legacy", serde_json::json!({"pillars": {"year": "庚午"}, "fiveElements": {"Metal": 3}}));

    let cache = cache_with(mirror.clone());

    assert!(cache.get("broken").await.is_none());
    assert!(!mirror.contains("broken"));

    // 結構看似完整但無法解碼，同樣視為損壞
    assert!(cache.get("legacy").await.is_none());
    assert!(!mirror.contains("legacy"));

    let stats = cache.stats();
    assert_eq!(stats.corrective_deletes, 2);
    assert_eq!(stats.misses, 2);
    assert!(cache.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_mirror_outage_is_a_silent_miss() -> Result<()> {
    let mirror = Arc::new(InMemoryMirror::new());
    mirror
        .put("k", serde_json::to_value(sample_chart()?)?, None)
        .await?;
    mirror.set_available(false);

    let cache = cache_with(mirror.clone());
    assert!(cache.get("k").await.is_none());
    assert_eq!(cache.stats().mirror_failures, 1);

    // 鏡像層離線時寫入仍然成功（只寫本地層）
    cache.set("k", sample_chart()?);
    settle().await;
    assert!(cache.get("k").await.is_some());

    // 離線期間未刪除任何資料
    mirror.set_available(true);
    assert!(mirror.contains("k"));
    Ok(())
}

#[tokio::test]
async fn test_invalidate_removes_both_tiers() -> Result<()> {
    let mirror = Arc::new(InMemoryMirror::new());
    let cache = cache_with(mirror.clone());

    cache.set("k", sample_chart()?);
    settle().await;
    assert!(mirror.contains("k"));

    cache.invalidate("k").await;
    assert!(cache.is_empty());
    assert!(!mirror.contains("k"));
    Ok(())
}

#[tokio::test]
async fn test_clear_keeps_shared_mirror() -> Result<()> {
    let mirror = Arc::new(InMemoryMirror::new());
    let cache = cache_with(mirror.clone());

    cache.set("k", sample_chart()?);
    settle().await;
    cache.clear();

    assert!(cache.is_empty());
    assert!(mirror.contains("k"));
    assert!(cache.get("k").await.is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_respect_capacity() -> Result<()> {
    let cache = Arc::new(CalculationCache::new(&CacheConfig {
        max_entries: 3,
        ..CacheConfig::default()
    }));
    let chart = sample_chart()?;
    let keys: Vec<String> = (0..5).map(|i| format!("199{}-5-20-14-male", i)).collect();

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let cache = cache.clone();
        let chart = chart.clone();
        let keys = keys.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..500 {
                let key = &keys[(worker + i) % keys.len()];
                cache.set(key, chart.clone());
                cache.get(&keys[(worker * 3 + i) % keys.len()]).await;
            }
        }));
    }
    for task in tasks {
        task.await?;
    }

    assert!(cache.len() <= 3);
    let mut readable = 0;
    for key in &keys {
        if let Some(found) = cache.get(key).await {
            assert_eq!(found, chart);
            readable += 1;
        }
    }
    assert_eq!(readable, cache.len());
    assert!(cache.stats().evictions > 0);
    Ok(())
}
