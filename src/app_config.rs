use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::converter::DrawingFormat;
use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), or "auto" to let the service detect it
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO, optionally with region such as "en-GB")
    pub target_language: String,

    /// Glossary file with one column per language code
    #[serde(default)]
    pub glossary_path: Option<PathBuf>,

    /// Where translated drawings are written; defaults to an `output` folder
    /// next to each input
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Archive root; translated drawings are also copied to `<archive_dir>/<TARGET>/`
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,

    /// Parent for per-file temporary folders; system temp dir when unset
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Maximum number of drawings processed at the same time
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// Write a `<stem>_<TARGET>.translation.log` audit file next to each output
    #[serde(default = "default_true")]
    pub write_audit_log: bool,

    /// Translation service config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// DWG/DXF converter config
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation service type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: DeepL Pro API
    #[default]
    DeepL,
    // @provider: DeepL Free API
    DeepLFree,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepL => "DeepL",
            Self::DeepLFree => "DeepL Free",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepL => "deepl".to_string(),
            Self::DeepLFree => "deeplfree".to_string(),
        }
    }

    // @returns: Base URL of the service
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::DeepL => "https://api.deepl.com",
            Self::DeepLFree => "https://api-free.deepl.com",
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "deeplfree" | "deepl-free" => Ok(Self::DeepLFree),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation service to use
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: API key; DEEPL_API_KEY overrides it from the command line
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL, empty for the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Server-side glossary id passed along with every request
    #[serde(default)]
    pub glossary_id: Option<String>,

    /// Send the matched glossary terms as a context hint with protected strings
    #[serde(default = "default_true")]
    pub send_context_hint: bool,

    /// Reuse translations of identical strings within one drawing
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl TranslationConfig {
    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.trim().is_empty() {
            return self.endpoint.trim_end_matches('/').to_string();
        }
        self.provider.default_endpoint().to_string()
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            api_key: String::new(),
            endpoint: String::new(),
            glossary_id: None,
            send_context_hint: true,
            cache_enabled: true,
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
        }
    }
}

/// DWG/DXF converter configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConverterConfig {
    /// Path of the ODA File Converter executable
    #[serde(default = "default_converter_executable")]
    pub executable: PathBuf,

    /// Drawing version passed to the converter, e.g. "ACAD2018"
    #[serde(default = "default_output_version")]
    pub output_version: String,

    /// Format of the final drawing
    #[serde(default)]
    pub output_format: DrawingFormat,

    /// Ask the converter to audit and repair drawings
    #[serde(default = "default_true")]
    pub audit: bool,

    /// Maximum time for one converter run
    #[serde(default = "default_converter_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            executable: default_converter_executable(),
            output_version: default_output_version(),
            output_format: DrawingFormat::default(),
            audit: true,
            timeout_secs: default_converter_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    language_utils::AUTO_DETECT.to_string()
}

fn default_max_concurrent_files() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_converter_timeout_secs() -> u64 {
    300
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_true() -> bool {
    true
}

fn default_output_version() -> String {
    "ACAD2018".to_string()
}

fn default_converter_executable() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\ODA\ODAFileConverter 25.12.0\ODAFileConverter.exe")
    } else {
        PathBuf::from("ODAFileConverter")
    }
}

impl Config {
    /// Load the configuration from a JSON file, writing a default one first
    /// when the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !language_utils::is_auto_detect(&self.source_language) {
            language_utils::get_language_name(&self.source_language)
                .context("Invalid source language")?;
        }
        language_utils::get_language_name(&self.target_language)
            .context("Invalid target language")?;

        if self.translation.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} (set it in the config or DEEPL_API_KEY)",
                self.translation.provider.display_name()
            ));
        }

        if self.max_concurrent_files == 0 {
            return Err(anyhow!("max_concurrent_files must be at least 1"));
        }

        if self.translation.timeout_secs == 0 || self.converter.timeout_secs == 0 {
            return Err(anyhow!("Timeouts must be greater than zero"));
        }

        if matches!(self.translation.rate_limit, Some(0)) {
            return Err(anyhow!("rate_limit must be positive when set"));
        }

        let endpoint = self.translation.get_endpoint();
        let parsed = url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid translation endpoint: {}", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("Translation endpoint must use http or https: {}", endpoint));
        }

        // server-side glossaries are bound to a language pair
        if self.translation.glossary_id.is_some() && language_utils::is_auto_detect(&self.source_language) {
            return Err(anyhow!("glossary_id requires an explicit source_language"));
        }

        if let Some(glossary) = &self.glossary_path {
            if !glossary.is_file() {
                return Err(anyhow!("Glossary file does not exist: {:?}", glossary));
            }
            if language_utils::is_auto_detect(&self.source_language) {
                return Err(anyhow!("A glossary requires an explicit source_language to pick its column"));
            }
        }

        Ok(())
    }

    /// Upper-case target language suffix used in output file names
    pub fn target_suffix(&self) -> String {
        self.target_language.trim().to_uppercase()
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: "de".to_string(),
            glossary_path: None,
            output_dir: None,
            archive_dir: None,
            work_dir: None,
            max_concurrent_files: default_max_concurrent_files(),
            write_audit_log: true,
            translation: TranslationConfig::default(),
            converter: ConverterConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
