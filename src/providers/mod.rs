/*!
 * Translation service clients.
 *
 * - `deepl`: DeepL REST API (Pro and Free endpoints)
 * - `mock`: scripted provider used by tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One string to translate, with everything the service needs to know about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateRequest {
    /// Text to translate, possibly containing placeholder tokens
    pub text: String,
    /// Source language in service form; `None` lets the service detect it
    pub source_language: Option<String>,
    /// Target language in service form
    pub target_language: String,
    /// Server-side glossary to apply
    pub glossary_id: Option<String>,
    /// Extra context that guides the translation but is not translated itself
    pub context: Option<String>,
}

/// Common trait for all translation services
///
/// Implementations are shared across file workers, so they must be usable
/// concurrently through a shared reference.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate a single string
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(&self, request: TranslateRequest) -> Result<String, ProviderError>;

    /// Test the connection to the service
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

pub mod deepl;
pub mod mock;
