use anyhow::Result;
use bazi_core::utils::validation::Validate;
use bazi_core::AppConfig;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_app_config_from_file_with_env_substitution() -> Result<()> {
    std::env::set_var("BAZI_TEST_MIRROR_HOST", "mirror.internal:8080");

    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[cache]
ttl_ms = 0
max_entries = 50

[mirror]
url = "http://${{BAZI_TEST_MIRROR_HOST}}/kv"

[calendar]
endpoint = "https://calendar.example.com/sexagenary"
timeout_seconds = 3
"#
    )?;

    let config = AppConfig::from_file(file.path())?;
    config.validate()?;

    assert_eq!(config.cache.ttl(), None);
    assert_eq!(config.cache.capacity(), Some(50));
    assert_eq!(config.mirror.url.as_deref(), Some("http://mirror.internal:8080/kv"));
    assert_eq!(config.mirror.timeout(), Duration::from_millis(50));
    assert_eq!(config.mirror.key_prefix, "bazi:chart:");
    assert_eq!(config.calendar_timeout_seconds(), 3);
    Ok(())
}

#[test]
fn test_app_config_rejects_two_calendar_sources() -> Result<()> {
    let config = AppConfig::from_toml_str(
        r#"
[calendar]
endpoint = "https://calendar.example.com"
file = "calendar.json"
"#,
    )?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn test_empty_config_uses_defaults() -> Result<()> {
    let config = AppConfig::from_toml_str("")?;
    config.validate()?;

    assert_eq!(config.cache.ttl(), Some(Duration::from_millis(21_600_000)));
    assert_eq!(config.cache.capacity(), Some(500));
    assert!(config.mirror.url.is_none());
    Ok(())
}
