/*!
 * Translation caching functionality.
 *
 * Title blocks and tables repeat the same strings many times in one
 * drawing. The cache lives as long as one file run and is never persisted.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cache key: the exact text sent and the request parameters that shape the answer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_text: String,
    target_language: String,
    context: Option<String>,
}

/// Translation cache for storing and retrieving translations
#[derive(Debug)]
pub struct TranslationCache {
    cache: RwLock<HashMap<CacheKey, String>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    enabled: bool,
}

impl TranslationCache {
    /// Create a new translation cache
    pub fn new(enabled: bool) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            enabled,
        }
    }

    /// Get a translation from the cache
    pub fn get(&self, source_text: &str, target_language: &str, context: Option<&str>) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey {
            source_text: source_text.to_string(),
            target_language: target_language.to_string(),
            context: context.map(str::to_string),
        };

        match self.cache.read().get(&key) {
            Some(translation) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}' -> {}", truncate_text(source_text, 30), target_language);
                Some(translation.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a translation in the cache
    pub fn store(&self, source_text: &str, target_language: &str, context: Option<&str>, translation: &str) {
        if !self.enabled {
            return;
        }

        let key = CacheKey {
            source_text: source_text.to_string(),
            target_language: target_language.to_string(),
            context: context.map(str::to_string),
        };
        self.cache.write().insert(key, translation.to_string());
    }

    /// (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
