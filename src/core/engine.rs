use crate::core::cache::{cache_key, CalculationCache};
use crate::core::chart::assemble;
use crate::core::solar_time::correct_birth;
use crate::domain::model::{BirthInput, FourPillarsChart, SolarTimeCorrection};
use crate::domain::ports::{CalendarProvider, LocationResolver};
use crate::utils::error::{BaziError, Result};
use std::sync::Arc;

/// 排盤服務：快取 → 曆法服務 → 組盤 → 回寫快取
pub struct ChartService<C: CalendarProvider, L: LocationResolver> {
    calendar: C,
    locations: L,
    cache: Arc<CalculationCache>,
}

impl<C: CalendarProvider, L: LocationResolver> ChartService<C, L> {
    pub fn new(calendar: C, locations: L, cache: Arc<CalculationCache>) -> Self {
        Self {
            calendar,
            locations,
            cache,
        }
    }

    pub fn cache(&self) -> &CalculationCache {
        &self.cache
    }

    pub async fn chart_for(&self, input: &BirthInput) -> Result<FourPillarsChart> {
        let key = cache_key(input);

        if let Some(key) = &key {
            if let Some(chart) = self.cache.get(key).await {
                return Ok(chart);
            }
        } else {
            tracing::debug!("Birth input is not cacheable, computing directly");
        }

        // 湊不出出生時刻時，曆法服務同樣無法排盤
        let birth = input.normalize().map_err(|e| BaziError::CalendarError {
            message: format!("no birth moment to convert: {}", e),
        })?;
        let output = self.calendar.sexagenary(&birth).await.map_err(|e| {
            tracing::error!("❌ Calendar service failed: {}", e);
            e
        })?;
        let chart = assemble(&output)?;

        if let Some(key) = &key {
            self.cache.set(key, chart.clone());
        }
        Ok(chart)
    }

    /// 真太陽時修正；地點無法解析或缺少時區偏移時回傳 Ok(None)
    pub fn solar_time_for(&self, input: &BirthInput) -> Result<Option<SolarTimeCorrection>> {
        correct_birth(input, &self.locations)
    }
}
