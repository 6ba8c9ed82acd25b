use crate::domain::model::{CalendarOutput, NormalizedBirth};
use crate::domain::ports::CalendarProvider;
use crate::utils::error::{BaziError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

/// 透過 HTTP 呼叫干支曆法服務
pub struct HttpCalendar {
    client: Client,
    endpoint: String,
}

impl HttpCalendar {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        validate_url("calendar.endpoint", endpoint)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendar {
    async fn sexagenary(&self, birth: &NormalizedBirth) -> Result<CalendarOutput> {
        tracing::debug!("Requesting sexagenary chart from: {}", self.endpoint);

        let mut params = vec![
            ("year", birth.year.to_string()),
            ("month", birth.month.to_string()),
            ("day", birth.day.to_string()),
            ("hour", birth.hour.to_string()),
            ("minute", birth.minute.to_string()),
        ];
        if let Some(gender) = &birth.gender {
            params.push(("gender", gender.clone()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BaziError::CalendarError {
                message: format!("calendar service responded with status {}", status),
            });
        }

        let output: CalendarOutput = response.json().await?;
        Ok(output)
    }
}

/// 從磁碟讀取預先算好的曆法輸出（單筆 JSON）
pub struct JsonFileCalendar {
    path: PathBuf,
}

impl JsonFileCalendar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CalendarProvider for JsonFileCalendar {
    async fn sexagenary(&self, _birth: &NormalizedBirth) -> Result<CalendarOutput> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| BaziError::CalendarError {
            message: format!("cannot read {}: {}", self.path.display(), e),
        })?;
        let output = serde_json::from_slice(&content)?;
        Ok(output)
    }
}
