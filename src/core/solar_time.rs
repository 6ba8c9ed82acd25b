//! 真太陽時修正
//!
//! 時區標準經線 = 時區偏移(小時) × 15°，每偏離 1° 經度相差 4 分鐘。
//! 出生地在標準經線以東時，真太陽時比鐘錶時間快。

use crate::domain::model::{BirthInput, Location, SolarTimeCorrection};
use crate::domain::ports::LocationResolver;
use crate::utils::error::Result;
use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

const MINUTES_PER_DEGREE: f64 = 4.0;

pub fn reference_meridian(timezone_offset_minutes: f64) -> f64 {
    timezone_offset_minutes / 60.0 * 15.0
}

pub fn correction_minutes(timezone_offset_minutes: f64, longitude: f64) -> f64 {
    MINUTES_PER_DEGREE * (longitude - reference_meridian(timezone_offset_minutes))
}

/// 計算真太陽時。地點或時區偏移缺一即不適用，回傳 None
pub fn correct(
    birth_moment: NaiveDateTime,
    timezone_offset_minutes: Option<f64>,
    location: Option<Location>,
) -> Option<SolarTimeCorrection> {
    let offset = timezone_offset_minutes.filter(|o| o.is_finite())?;
    let location = location.filter(|l| l.longitude.is_finite())?;

    let minutes = correction_minutes(offset, location.longitude);
    let shift = Duration::milliseconds((minutes * 60_000.0).round() as i64);

    Some(SolarTimeCorrection {
        correction_minutes: minutes,
        corrected_timestamp: birth_moment + shift,
        location,
    })
}

/// 出生資料的時區偏移：優先使用分鐘數，否則解析時區字串
pub fn timezone_offset(input: &BirthInput) -> Option<f64> {
    input
        .timezone_offset_minutes
        .as_ref()
        .and_then(|o| o.coerce())
        .map(|o| o as f64)
        .or_else(|| input.timezone.as_deref().and_then(parse_utc_offset))
}

/// 由出生資料直接計算真太陽時；地點查不到時回傳 Ok(None)
pub fn correct_birth<L: LocationResolver + ?Sized>(
    input: &BirthInput,
    locations: &L,
) -> Result<Option<SolarTimeCorrection>> {
    let moment = input.normalize()?.local_datetime()?;

    let location = input
        .birth_location
        .as_deref()
        .and_then(|query| locations.resolve(query));
    if location.is_none() {
        tracing::debug!(
            "Birth location {:?} not resolved, skipping solar time correction",
            input.birth_location
        );
    }

    Ok(correct(moment, timezone_offset(input), location))
}

fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i:utc|gmt)?\s*([+-])(\d{1,2})(?::?(\d{2}))?$")
            .expect("offset pattern is valid")
    })
}

/// 解析固定偏移的時區字串，例如 `UTC+8`、`GMT-05:30`、`+0800`
pub fn parse_utc_offset(timezone: &str) -> Option<f64> {
    let tz = timezone.trim();
    if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("gmt") || tz == "Z" {
        return Some(0.0);
    }

    let caps = offset_pattern().captures(tz)?;
    let hours: f64 = caps[2].parse().ok()?;
    let minutes: f64 = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0.0,
    };
    if hours > 14.0 || minutes >= 60.0 {
        return None;
    }

    let total = hours * 60.0 + minutes;
    Some(if &caps[1] == "-" { -total } else { total })
}
