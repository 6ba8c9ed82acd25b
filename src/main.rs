use bazi_core::config::cli::Command;
use bazi_core::core::scoring::{daily_fortune, synastry};
use bazi_core::core::solar_time::correct_birth;
use bazi_core::domain::model::{BirthInput, FourPillarsChart, GanZhi};
use bazi_core::domain::ports::CalendarProvider;
use bazi_core::utils::error::{BaziError, Result};
use bazi_core::utils::{logger, validation::Validate};
use bazi_core::{
    AppConfig, CalculationCache, ChartService, CliConfig, HttpCalendar, HttpMirror,
    JsonFileCalendar, LocationTable,
};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting bazi-core CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證命令列參數
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Argument validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&cli).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤類別決定退出碼
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> Result<String> {
    let config = cli.app_config()?;
    tracing::info!("✅ Configuration loaded and validated successfully");

    match &cli.command {
        Command::Chart { birth, .. } => {
            let input: BirthInput = read_json(birth).await?;
            let cache = Arc::new(build_cache(&config)?);

            let chart = match (&config.calendar.endpoint, &config.calendar.file) {
                (Some(endpoint), _) => {
                    let timeout = Duration::from_secs(config.calendar_timeout_seconds());
                    let calendar = HttpCalendar::new(endpoint, timeout)?;
                    compute_chart(calendar, &config, cache, &input).await?
                }
                (None, Some(file)) => {
                    let calendar = JsonFileCalendar::new(file);
                    compute_chart(calendar, &config, cache, &input).await?
                }
                (None, None) => {
                    return Err(BaziError::MissingConfigError {
                        field: "calendar.endpoint".to_string(),
                    })
                }
            };

            tracing::info!("✅ Chart computed for day master {}", chart.day_master().raw);
            Ok(serde_json::to_string_pretty(&chart)?)
        }
        Command::SolarTime { birth, .. } => {
            let input: BirthInput = read_json(birth).await?;
            let locations = load_locations(&config)?;

            match correct_birth(&input, &locations)? {
                Some(correction) => {
                    tracing::info!(
                        "🕐 Solar time correction: {:.2} minutes at {}",
                        correction.correction_minutes,
                        correction.location.name
                    );
                    Ok(serde_json::to_string_pretty(&correction)?)
                }
                None => {
                    tracing::warn!("⚠️ Solar time correction not applicable");
                    Ok("null".to_string())
                }
            }
        }
        Command::Synastry { first, second } => {
            let a: FourPillarsChart = read_json(first).await?;
            let b: FourPillarsChart = read_json(second).await?;
            let score = synastry(&a, &b);
            tracing::info!("💞 Synastry score: {}", score.score);
            Ok(serde_json::to_string_pretty(&score)?)
        }
        Command::Fortune { chart, day } => {
            let chart: FourPillarsChart = read_json(chart).await?;
            let today = parse_day(day)?;
            let fortune = daily_fortune(&chart, &today);
            tracing::info!("🔮 Daily fortune score: {}", fortune.score);
            Ok(serde_json::to_string_pretty(&fortune)?)
        }
    }
}

async fn compute_chart<C: CalendarProvider>(
    calendar: C,
    config: &AppConfig,
    cache: Arc<CalculationCache>,
    input: &BirthInput,
) -> Result<FourPillarsChart> {
    let service = ChartService::new(calendar, load_locations(config)?, cache);
    service.chart_for(input).await
}

fn build_cache(config: &AppConfig) -> Result<CalculationCache> {
    let cache = CalculationCache::new(&config.cache);
    if config.mirror.url.is_some() {
        tracing::info!("🔗 Cache mirror enabled");
        return Ok(cache.with_mirror(Arc::new(HttpMirror::new(&config.mirror)?)));
    }
    Ok(cache)
}

fn load_locations(config: &AppConfig) -> Result<LocationTable> {
    let mut table = LocationTable::builtin();
    if let Some(csv_path) = &config.locations.csv_path {
        let added = table.extend_from_csv_file(csv_path)?;
        tracing::info!("📍 Loaded {} extra locations from {}", added, csv_path);
    }
    Ok(table)
}

async fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

fn parse_day(day: &str) -> Result<GanZhi> {
    let mut chars = day.trim().chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(stem), Some(branch), None) => Ok(GanZhi {
            stem: stem.to_string(),
            branch: branch.to_string(),
        }),
        _ => Err(BaziError::InvalidConfigValueError {
            field: "day".to_string(),
            value: day.to_string(),
            reason: "Expected a stem followed by a branch, e.g. 甲子".to_string(),
        }),
    }
}
