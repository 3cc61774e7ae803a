/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationService` that the decision engine
 * calls for every string that needs machine translation, plus the log
 * capture each file run uses for its audit trail.
 */

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::{TranslationCache, truncate_text};
use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, TranslateRequest};

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
}

/// Collects the log lines of one file run and mirrors them to the `log` facade
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    prefix: String,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCapture {
    /// Create a capture whose mirrored lines start with `[prefix]`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, level: &str, message: String) {
        self.entries.lock().push(LogEntry {
            level: level.to_string(),
            message,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] {}", self.prefix, message);
        self.push("INFO", message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {}", self.prefix, message);
        self.push("WARN", message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("[{}] {}", self.prefix, message);
        self.push("ERROR", message);
    }

    /// Audit detail; mirrored at debug level only
    pub fn audit(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("[{}] {}", self.prefix, message);
        self.push("AUDIT", message);
    }

    /// Snapshot of all captured lines
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Number of captured lines at the given level
    pub fn count(&self, level: &str) -> usize {
        self.entries.lock().iter().filter(|e| e.level == level).count()
    }
}

/// Language pair and request options shared by every file of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Source language in service form; `None` for auto-detection
    pub source_language: Option<String>,
    /// Target language in service form
    pub target_language: String,
    /// Server-side glossary id
    pub glossary_id: Option<String>,
    /// Pass matched glossary terms as request context
    pub send_context_hint: bool,
    /// Reuse answers for identical strings within a file
    pub cache_enabled: bool,
}

impl TranslationOptions {
    pub fn new(source_language: Option<&str>, target_language: &str) -> Self {
        Self {
            source_language: source_language.map(str::to_string),
            target_language: target_language.to_string(),
            glossary_id: None,
            send_context_hint: true,
            cache_enabled: true,
        }
    }

    /// Build options from the configuration, converting language codes to the service form
    pub fn from_config(config: &Config) -> Result<Self> {
        let source_language = language_utils::to_deepl_source_code(&config.source_language)
            .context("Invalid source language")?;
        let target_language = language_utils::to_deepl_code(&config.target_language)
            .context("Invalid target language")?;

        Ok(Self {
            source_language,
            target_language,
            glossary_id: config.translation.glossary_id.clone(),
            send_context_hint: config.translation.send_context_hint,
            cache_enabled: config.translation.cache_enabled,
        })
    }
}

/// Counters for one file run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationStats {
    /// Calls made to the service
    pub requests: usize,
    /// Calls that failed after all retries
    pub failures: usize,
    /// Strings answered from the cache
    pub cache_hits: usize,
    /// Time spent waiting on the service
    pub api_duration: Duration,
}

impl TranslationStats {
    pub fn summary(&self) -> String {
        format!(
            "{} request(s), {} failure(s), {} cache hit(s), {:.1}s in service",
            self.requests,
            self.failures,
            self.cache_hits,
            self.api_duration.as_secs_f64()
        )
    }
}

/// Translation gateway used by one file run
#[derive(Debug)]
pub struct TranslationService {
    provider: Arc<dyn Provider>,
    options: TranslationOptions,
    cache: TranslationCache,
    stats: Mutex<TranslationStats>,
}

impl TranslationService {
    pub fn new(provider: Arc<dyn Provider>, options: TranslationOptions) -> Self {
        let cache = TranslationCache::new(options.cache_enabled);
        Self {
            provider,
            options,
            cache,
            stats: Mutex::new(TranslationStats::default()),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Translate one string
    ///
    /// `context_hint` is forwarded only when context hints are enabled.
    pub async fn translate(&self, text: &str, context_hint: Option<&str>) -> Result<String, ProviderError> {
        let context = context_hint
            .filter(|c| self.options.send_context_hint && !c.is_empty())
            .map(str::to_string);
        let target = self.options.target_language.as_str();

        if let Some(cached) = self.cache.get(text, target, context.as_deref()) {
            return Ok(cached);
        }

        let request = TranslateRequest {
            text: text.to_string(),
            source_language: self.options.source_language.clone(),
            target_language: self.options.target_language.clone(),
            glossary_id: self.options.glossary_id.clone(),
            context: context.clone(),
        };

        let started = Instant::now();
        let result = self.provider.translate(request).await;
        {
            let mut stats = self.stats.lock();
            stats.requests += 1;
            stats.api_duration += started.elapsed();
            if result.is_err() {
                stats.failures += 1;
            }
        }

        let translated = result?;
        debug!(
            "{} translated '{}' -> '{}'",
            self.provider.name(),
            truncate_text(text, 40),
            truncate_text(&translated, 40)
        );
        self.cache.store(text, target, context.as_deref(), &translated);
        Ok(translated)
    }

    pub fn stats(&self) -> TranslationStats {
        let (cache_hits, _, _) = self.cache.stats();
        TranslationStats {
            cache_hits,
            ..self.stats.lock().clone()
        }
    }
}
