use anyhow::Result;
use bazi_core::domain::model::{BirthInput, Element, TenGod};
use bazi_core::utils::error::BaziError;
use bazi_core::{
    CacheConfig, CalculationCache, ChartService, HttpCalendar, HttpMirror, JsonFileCalendar,
    LocationTable, MirrorConfig,
};
use httpmock::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn calendar_body() -> serde_json::Value {
    let luck: Vec<serde_json::Value> = ["庚午", "辛未", "壬申", "癸酉", "甲戌", "乙亥", "丙子", "丁丑", "戊寅", "己卯"]
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            serde_json::json!({
                "startAge": i as u32 * 10,
                "endAge": i as u32 * 10 + 9,
                "stemBranchPair": pair,
                "startYear": 1990 + i as i32 * 10,
                "endYear": 1999 + i as i32 * 10
            })
        })
        .collect();

    serde_json::json!({
        "year": {"stem": "庚", "branch": "午"},
        "month": {"stem": "辛", "branch": "巳"},
        "day": {"stem": "辛", "branch": "亥"},
        "hour": {"stem": "乙", "branch": "未"},
        "luckSequence": luck
    })
}

fn birth_input() -> Result<BirthInput> {
    Ok(serde_json::from_value(serde_json::json!({
        "birthYear": "1990",
        "birthMonth": 5,
        "birthDay": 20.0,
        "birthHour": 14,
        "birthMinute": 30,
        "gender": " Male ",
        "birthLocation": "北京市朝阳区",
        "timezone": "UTC+8"
    }))?)
}

#[tokio::test]
async fn test_chart_from_http_calendar_is_cached() -> Result<()> {
    let server = MockServer::start();
    let calendar_mock = server.mock(|when, then| {
        when.method(GET).path("/sexagenary").query_param("year", "1990");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(calendar_body());
    });

    let calendar = HttpCalendar::new(&server.url("/sexagenary"), Duration::from_secs(5))?;
    let cache = Arc::new(CalculationCache::new(&CacheConfig::default()));
    let service = ChartService::new(calendar, LocationTable::builtin(), cache.clone());

    let chart = service.chart_for(&birth_input()?).await?;
    let again = service.chart_for(&birth_input()?).await?;

    calendar_mock.assert_hits(1);
    assert_eq!(chart, again);
    assert_eq!(chart.day_master().raw, "辛");
    assert_eq!(chart.five_elements.get(&Element::Metal), Some(&3));
    assert_eq!(chart.luck_cycles.len(), 8);
    assert_eq!(chart.luck_cycles[0].age_range, "10-19");
    assert_eq!(chart.ten_gods.iter().map(|t| t.strength).sum::<u32>(), 70);
    assert!(chart.ten_gods.iter().all(|t| t.name != TenGod::Unknown));
    assert!(cache.stats().hits >= 1);
    Ok(())
}

#[tokio::test]
async fn test_second_instance_reads_through_http_mirror() -> Result<()> {
    let calendar_server = MockServer::start();
    let calendar_mock = calendar_server.mock(|when, then| {
        when.method(GET).path("/sexagenary");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(calendar_body());
    });

    let mirror_server = MockServer::start();
    let mut mirror_miss = mirror_server.mock(|when, then| {
        when.method(GET).path("/kv/bazi:chart:1990-5-20-14-male");
        then.status(404);
    });
    let mirror_put = mirror_server.mock(|when, then| {
        when.method(PUT).path("/kv/bazi:chart:1990-5-20-14-male");
        then.status(204);
    });

    let mirror_config = MirrorConfig {
        url: Some(mirror_server.url("/kv")),
        timeout_ms: 500,
        ..MirrorConfig::default()
    };

    let first = ChartService::new(
        HttpCalendar::new(&calendar_server.url("/sexagenary"), Duration::from_secs(5))?,
        LocationTable::builtin(),
        Arc::new(
            CalculationCache::new(&CacheConfig::default())
                .with_mirror(Arc::new(HttpMirror::new(&mirror_config)?)),
        ),
    );
    let chart = first.chart_for(&birth_input()?).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    mirror_miss.assert_hits(1);
    mirror_put.assert_hits(1);
    mirror_miss.delete();

    let mirror_hit = mirror_server.mock(|when, then| {
        when.method(GET).path("/kv/bazi:chart:1990-5-20-14-male");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::to_value(&chart).unwrap());
    });

    let second_cache = Arc::new(
        CalculationCache::new(&CacheConfig::default())
            .with_mirror(Arc::new(HttpMirror::new(&mirror_config)?)),
    );
    let second = ChartService::new(
        HttpCalendar::new(&calendar_server.url("/sexagenary"), Duration::from_secs(5))?,
        LocationTable::builtin(),
        second_cache.clone(),
    );
    let from_mirror = second.chart_for(&birth_input()?).await?;

    mirror_hit.assert_hits(1);
    calendar_mock.assert_hits(1);
    assert_eq!(from_mirror, chart);
    assert_eq!(second_cache.stats().mirror_hits, 1);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_mirror_falls_back_to_calendar() -> Result<()> {
    let calendar_server = MockServer::start();
    calendar_server.mock(|when, then| {
        when.method(GET).path("/sexagenary");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(calendar_body());
    });

    let mirror_config = MirrorConfig {
        url: Some("http://127.0.0.1:9".to_string()),
        timeout_ms: 50,
        ..MirrorConfig::default()
    };
    let cache = Arc::new(
        CalculationCache::new(&CacheConfig::default())
            .with_mirror(Arc::new(HttpMirror::new(&mirror_config)?)),
    );
    let service = ChartService::new(
        HttpCalendar::new(&calendar_server.url("/sexagenary"), Duration::from_secs(5))?,
        LocationTable::builtin(),
        cache.clone(),
    );

    let chart = service.chart_for(&birth_input()?).await?;
    assert_eq!(chart.pillars.year.stem.raw, "庚");
    assert_eq!(cache.stats().mirror_failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_unusable_calendar_output_is_an_error() -> Result<()> {
    let mut body = calendar_body();
    body["hour"]["branch"] = serde_json::json!("");

    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(body.to_string().as_bytes())?;

    let service = ChartService::new(
        JsonFileCalendar::new(temp_file.path()),
        LocationTable::builtin(),
        Arc::new(CalculationCache::new(&CacheConfig::default())),
    );

    let result = service.chart_for(&birth_input()?).await;
    assert!(matches!(result, Err(BaziError::UnusableCalendarOutput { .. })));
    assert!(service.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_solar_time_for_birth_input() -> Result<()> {
    let service = ChartService::new(
        JsonFileCalendar::new("unused.json"),
        LocationTable::builtin(),
        Arc::new(CalculationCache::new(&CacheConfig::default())),
    );

    let correction = service
        .solar_time_for(&birth_input()?)?
        .expect("Beijing resolves with a fixed offset");

    assert_eq!(correction.location.name, "Beijing");
    // 116.4074°E 相對 120°E 標準經線，慢約 14.37 分鐘
    assert_eq!(
        correction.corrected_timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        "1990-05-20 14:15:37"
    );
    Ok(())
}
