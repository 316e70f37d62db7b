//! Mock provider for deterministic testing

use crate::LlmError;
use chunkwise_domain::traits::LlmProvider as LlmProviderTrait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock answers for a matched prompt
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(LlmError),
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network calls.
/// Replies are chosen in this order: exact prompt match, first substring rule
/// that matches, then the default response. Failures can also be injected by
/// call number, counting from 1.
///
/// # Examples
///
/// ```
/// use chunkwise_llm::{LlmError, MockProvider};
/// use chunkwise_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Multiple responses
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.fail_when_contains("line 25", LlmError::Timeout("slow".to_string()));
/// assert_eq!(provider.generate("prompt1").unwrap(), "response1");
/// assert!(provider.generate("... line 25 ...").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    responses: Arc<Mutex<HashMap<String, MockReply>>>,
    contains_rules: Arc<Mutex<Vec<(String, MockReply)>>>,
    failing_calls: Arc<Mutex<HashSet<usize>>>,
    call_count: Arc<Mutex<usize>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            contains_rules: Arc::new(Mutex::new(Vec::new())),
            failing_calls: Arc::new(Mutex::new(HashSet::new())),
            call_count: Arc::new(Mutex::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Sleep for `delay` on every call before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report `model` as the model name
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt.into(), MockReply::Text(response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        self.responses.lock().unwrap().insert(
            prompt.into(),
            MockReply::Fail(LlmError::Other("Mock error".to_string())),
        );
    }

    /// Answer `response` to any prompt containing `needle`
    pub fn respond_when_contains(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        self.contains_rules
            .lock()
            .unwrap()
            .push((needle.into(), MockReply::Text(response.into())));
    }

    /// Fail with `error` on any prompt containing `needle`
    pub fn fail_when_contains(&mut self, needle: impl Into<String>, error: LlmError) {
        self.contains_rules
            .lock()
            .unwrap()
            .push((needle.into(), MockReply::Fail(error)));
    }

    /// Fail the `n`th call (1-based) with a communication error
    pub fn fail_on_call(&mut self, n: usize) {
        self.failing_calls.lock().unwrap().insert(n);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *self.call_count.lock().unwrap() = 0;
    }

    /// Every prompt received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn reply_for(&self, prompt: &str) -> MockReply {
        if let Some(reply) = self.responses.lock().unwrap().get(prompt) {
            return reply.clone();
        }
        self.contains_rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| MockReply::Text(self.default_response.clone()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let call = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(LlmError::Communication(format!("Mock failure on call {}", call)));
        }

        match self.reply_for(prompt) {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(e) => Err(e),
        }
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        // The mock does not constrain output; callers validate what comes back
        self.generate(prompt)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt");
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Test response");
    }

    #[test]
    fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello").unwrap(), "world");
        assert_eq!(provider.generate("foo").unwrap(), "bar");
        assert_eq!(provider.generate("unknown").unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate("prompt2").unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt");

        assert_eq!(
            provider.generate("bad prompt"),
            Err(LlmError::Other("Mock error".to_string()))
        );
        assert!(provider.generate("good prompt").is_ok());
    }

    #[test]
    fn test_contains_rules_first_match_wins() {
        let mut provider = MockProvider::new("{}");
        provider.respond_when_contains("ERROR", r#"{"level": "error"}"#);
        provider.fail_when_contains("ERROR disk", LlmError::Timeout("slow".to_string()));

        assert_eq!(provider.generate("x ERROR disk y").unwrap(), r#"{"level": "error"}"#);
        assert_eq!(provider.generate("nothing here").unwrap(), "{}");
    }

    #[test]
    fn test_exact_match_beats_contains_rule() {
        let mut provider = MockProvider::new("{}");
        provider.fail_when_contains("chunk", LlmError::RateLimitExceeded);
        provider.add_response("chunk 3", "exact");

        assert_eq!(provider.generate("chunk 3").unwrap(), "exact");
        assert_eq!(provider.generate("chunk 4"), Err(LlmError::RateLimitExceeded));
    }

    #[test]
    fn test_fail_on_call_number() {
        let mut provider = MockProvider::new("ok");
        provider.fail_on_call(2);

        assert!(provider.generate("a").is_ok());
        assert!(matches!(provider.generate("a"), Err(LlmError::Communication(_))));
        assert!(provider.generate("a").is_ok());
    }

    #[test]
    fn test_prompts_are_recorded_through_clones() {
        let provider = MockProvider::new("ok").with_model_name("qwen2.5:7b");
        let clone = provider.clone();
        clone.generate_structured("first", "{}").unwrap();
        provider.generate("second").unwrap();

        assert_eq!(provider.prompts(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(clone.model_name(), "qwen2.5:7b");
    }
}
