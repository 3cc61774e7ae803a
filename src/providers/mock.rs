/*!
 * Mock provider implementation for testing.
 *
 * The mock simulates different service behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::identity()` - Returns the text unchanged
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::fail_on(text)` - Fails only for one input
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslateRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Succeeds with `[<target>] <text>`
    Working,
    /// Succeeds with the text unchanged
    Identity,
    /// Fails for inputs equal to the given text, works otherwise
    FailOn(String),
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<TranslateRequest>>>,
    custom_response: Option<fn(&TranslateRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn identity() -> Self {
        Self::new(MockBehavior::Identity)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn fail_on(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailOn(text.into()))
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Set a custom response generator used whenever the request succeeds
    pub fn with_custom_response(mut self, generator: fn(&TranslateRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls received, shared between clones
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<TranslateRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, request: &TranslateRequest) -> String {
        if let Some(generator) = self.custom_response {
            return generator(request);
        }
        match self.behavior {
            MockBehavior::Identity => request.text.clone(),
            _ => format!("[{}] {}", request.target_language, request.text),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn translate(&self, request: TranslateRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match &self.behavior {
            MockBehavior::Working | MockBehavior::Identity => Ok(self.respond(&request)),

            MockBehavior::FailOn(text) if *text == request.text => Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("Simulated failure for '{}'", text),
            }),
            MockBehavior::FailOn(_) => Ok(self.respond(&request)),

            MockBehavior::Intermittent { fail_every } => {
                let fail_every = *fail_every;
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(self.respond(&request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
