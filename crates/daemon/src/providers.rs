//! Provider registry and credential plumbing.
//!
//! Only the request/response contract lives in this workspace; concrete
//! HTTP adapters register at boot from the outside. Credentials are read
//! from the host environment (`<PROVIDER>_API_KEY`, `<PROVIDER>_BASE_URL`)
//! and never leave this process — children obtain completions through the
//! bridge.

use async_trait::async_trait;
use berth_core::{Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Role};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no provider registered for {0:?}")]
    NotRegistered(String),

    #[error("model identifier invalid: {0}")]
    BadModelRef(#[from] berth_core::ModelRefError),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider request aborted")]
    Aborted,
}

/// One LLM backend. Implementations must honor the abort token.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        model: &str,
        request: CompletionRequest,
        abort: CancellationToken,
    ) -> Result<CompletionResponse, ProviderError>;
}

/// Environment credentials for a provider, by naming convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// `xai` → `XAI_API_KEY` / `XAI_BASE_URL`.
pub fn credentials_for(provider: &str) -> Credentials {
    let prefix = provider.to_ascii_uppercase().replace('-', "_");
    Credentials {
        api_key: std::env::var(format!("{prefix}_API_KEY")).ok(),
        base_url: std::env::var(format!("{prefix}_BASE_URL")).ok(),
    }
}

/// Search engine id for the web-search tool, host-only like every credential.
pub fn google_cx() -> Option<String> {
    std::env::var("GOOGLE_CX").ok()
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Select the adapter by the `<provider>:` half of the model ref and
    /// run the completion.
    pub async fn complete(
        &self,
        model_ref: &str,
        request: CompletionRequest,
        abort: CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let parsed: berth_core::ModelRef = model_ref.parse()?;
        let provider = self
            .get(&parsed.provider)
            .ok_or_else(|| ProviderError::NotRegistered(parsed.provider.clone()))?;
        provider.complete(&parsed.model, request, abort).await
    }
}

/// Deterministic local provider: echoes the last user message back.
/// Registered under `mock` so a fresh install can smoke-test the loop
/// without credentials.
pub struct MockProvider;

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        _model: &str,
        request: CompletionRequest,
        _abort: CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResponse {
            choices: vec![Choice {
                message: ChoiceMessage { content: last_user, tool_calls: vec![] },
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        })
    }
}

/// Scripted provider for tests: pops one canned response per call,
/// registered under any name.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeProvider {
    name: String,
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<CompletionResponse, String>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeProvider {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            responses: parking_lot::Mutex::new(std::collections::VecDeque::new()),
        })
    }

    pub fn push(&self, response: CompletionResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: impl Into<String>) {
        self.responses.lock().push_back(Err(error.into()));
    }

    /// A single text choice, for scripting happy paths.
    pub fn text(content: &str, finish: &str) -> CompletionResponse {
        CompletionResponse {
            choices: vec![Choice {
                message: ChoiceMessage { content: content.to_string(), tool_calls: vec![] },
                finish_reason: Some(finish.to_string()),
            }],
            usage: None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        _model: &str,
        _request: CompletionRequest,
        _abort: CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(ProviderError::Request(error)),
            None => Err(ProviderError::Request("no scripted response".to_string())),
        }
    }
}

#[cfg(test)]
#[path = "providers_tests.rs"]
mod tests;
