/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::path::PathBuf;

use cadtranslator::app_config::{Config, LogLevel, TranslationProvider};
use cadtranslator::converter::DrawingFormat;

use crate::common;

fn valid_config() -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.translation.api_key = "key".to_string();
    config
}

#[test]
fn test_default_shouldUseDocumentedValues() {
    let config = Config::default();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.target_language, "de");
    assert_eq!(config.max_concurrent_files, 4);
    assert!(config.write_audit_log);
    assert_eq!(config.translation.provider, TranslationProvider::DeepL);
    assert_eq!(config.translation.timeout_secs, 30);
    assert_eq!(config.translation.retry_count, 3);
    assert_eq!(config.translation.retry_backoff_ms, 1000);
    assert_eq!(config.converter.timeout_secs, 300);
    assert_eq!(config.converter.output_version, "ACAD2018");
    assert_eq!(config.converter.output_format, DrawingFormat::Dwg);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() -> Result<()> {
    let json = r#"{
        "target_language": "it",
        "translation": { "provider": "deeplfree", "api_key": "abc" },
        "converter": { "output_format": "dxf" }
    }"#;
    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.target_suffix(), "IT");
    assert_eq!(config.translation.get_endpoint(), "https://api-free.deepl.com");
    assert_eq!(config.converter.output_format, DrawingFormat::Dxf);
    assert!(config.converter.audit);
    assert!(config.translation.cache_enabled);
    Ok(())
}

#[test]
fn test_validate_withValidConfig_shouldPass() -> Result<()> {
    valid_config().validate()
}

#[test]
fn test_validate_withMissingApiKey_shouldFail() {
    let mut config = valid_config();
    config.translation.api_key = "  ".to_string();

    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("API key"));
}

#[test]
fn test_validate_withBadLanguageOrLimits_shouldFail() {
    let mut config = valid_config();
    config.target_language = "klingon".to_string();
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.max_concurrent_files = 0;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.translation.rate_limit = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withNonHttpEndpoint_shouldFail() {
    let mut config = valid_config();
    config.translation.endpoint = "ftp://deepl.example".to_string();
    assert!(config.validate().is_err());

    config.translation.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withGlossaryAndAutoSource_shouldFail() -> Result<()> {
    let mut config = valid_config();
    config.source_language = "auto".to_string();
    config.translation.glossary_id = Some("gls-1".to_string());
    assert!(config.validate().is_err());

    let temp_dir = common::create_temp_dir()?;
    let glossary = common::create_test_file(temp_dir.path(), "terms.csv", "en;de\nshaft;Welle\n")?;
    let mut config = valid_config();
    config.source_language = "auto".to_string();
    config.glossary_path = Some(glossary.clone());
    assert!(config.validate().is_err());

    config.source_language = "en".to_string();
    config.validate()?;

    config.glossary_path = Some(PathBuf::from("/nonexistent/terms.csv"));
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.target_language, created.target_language);
    assert_eq!(reloaded.converter.executable, created.converter.executable);
    Ok(())
}

#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_provider_from_str_withAliases_shouldParse() -> Result<()> {
    assert_eq!("DeepL".parse::<TranslationProvider>()?, TranslationProvider::DeepL);
    assert_eq!("deepl-free".parse::<TranslationProvider>()?, TranslationProvider::DeepLFree);
    assert!("ollama".parse::<TranslationProvider>().is_err());
    Ok(())
}
