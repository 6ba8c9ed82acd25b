use crate::config::AppConfig;
use crate::utils::error::{BaziError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_url, Validate,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "bazi-core")]
#[command(about = "Four-pillars chart computation with a two-tier result cache")]
pub struct CliConfig {
    /// Path to TOML configuration file (falls back to BAZI_* environment variables)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build a chart from a birth-input JSON file
    Chart {
        #[arg(long)]
        birth: String,

        /// Calendar service URL (overrides calendar.endpoint)
        #[arg(long, conflicts_with = "calendar_file")]
        calendar_endpoint: Option<String>,

        /// Precomputed calendar output (overrides calendar.file)
        #[arg(long)]
        calendar_file: Option<String>,
    },

    /// True solar time correction for a birth-input JSON file
    SolarTime {
        #[arg(long)]
        birth: String,

        /// Extra locations CSV (name,latitude,longitude,aliases)
        #[arg(long)]
        locations_csv: Option<String>,
    },

    /// Compatibility score between two chart JSON files
    Synastry {
        #[arg(long)]
        first: String,

        #[arg(long)]
        second: String,
    },

    /// Daily fortune for a chart against a day stem-branch such as 甲子
    Fortune {
        #[arg(long)]
        chart: String,

        #[arg(long)]
        day: String,
    },
}

impl CliConfig {
    /// 載入設定檔或環境變數，再套用命令列覆蓋
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::from_env()?,
        };

        match &self.command {
            Command::Chart {
                calendar_endpoint: Some(endpoint),
                ..
            } => {
                config.calendar.endpoint = Some(endpoint.clone());
                config.calendar.file = None;
            }
            Command::Chart {
                calendar_file: Some(file),
                ..
            } => {
                config.calendar.file = Some(file.clone());
                config.calendar.endpoint = None;
            }
            Command::SolarTime {
                locations_csv: Some(csv_path),
                ..
            } => {
                config.locations.csv_path = Some(csv_path.clone());
            }
            _ => {}
        }

        config.validate()?;
        Ok(config)
    }
}

fn validate_json_file(field: &str, path: &str) -> Result<()> {
    validate_path(field, path)?;
    validate_file_extension(field, path, &["json"])
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(config) = &self.config {
            validate_path("config", config)?;
            validate_file_extension("config", config, &["toml"])?;
        }

        match &self.command {
            Command::Chart {
                birth,
                calendar_endpoint,
                calendar_file,
            } => {
                validate_json_file("birth", birth)?;
                if let Some(endpoint) = calendar_endpoint {
                    validate_url("calendar_endpoint", endpoint)?;
                }
                if let Some(file) = calendar_file {
                    validate_json_file("calendar_file", file)?;
                }
            }
            Command::SolarTime {
                birth,
                locations_csv,
            } => {
                validate_json_file("birth", birth)?;
                if let Some(csv_path) = locations_csv {
                    validate_path("locations_csv", csv_path)?;
                    validate_file_extension("locations_csv", csv_path, &["csv"])?;
                }
            }
            Command::Synastry { first, second } => {
                validate_json_file("first", first)?;
                validate_json_file("second", second)?;
            }
            Command::Fortune { chart, day } => {
                validate_json_file("chart", chart)?;
                validate_non_empty_string("day", day)?;
                if day.trim().chars().count() != 2 {
                    return Err(BaziError::InvalidConfigValueError {
                        field: "day".to_string(),
                        value: day.clone(),
                        reason: "Expected a stem followed by a branch, e.g. 甲子".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_subcommand() {
        let cli = CliConfig::try_parse_from([
            "bazi-core",
            "chart",
            "--birth",
            "birth.json",
            "--calendar-endpoint",
            "https://calendar.example.com/sexagenary",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(cli.validate().is_ok());
        assert!(matches!(cli.command, Command::Chart { .. }));
    }

    #[test]
    fn test_calendar_sources_conflict() {
        let result = CliConfig::try_parse_from([
            "bazi-core",
            "chart",
            "--birth",
            "birth.json",
            "--calendar-endpoint",
            "https://calendar.example.com",
            "--calendar-file",
            "out.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fortune_day_must_be_a_pair() {
        let cli = CliConfig::try_parse_from([
            "bazi-core", "fortune", "--chart", "chart.json", "--day", "甲",
        ])
        .unwrap();
        assert!(cli.validate().is_err());

        let cli = CliConfig::try_parse_from([
            "bazi-core", "fortune", "--chart", "chart.json", "--day", "甲子",
        ])
        .unwrap();
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_json_inputs() {
        let cli = CliConfig::try_parse_from([
            "bazi-core", "synastry", "--first", "a.json", "--second", "b.txt",
        ])
        .unwrap();
        assert!(cli.validate().is_err());
    }
}
