//! AI client contract and retry policy
//!
//! The transport (an OpenAI-compatible structured-output client) is a
//! collaborator outside this crate; here live the response types, the
//! client trait, and the retry wrapper that detects the silent rate-limit
//! signature (a prompt processed to zero completion tokens) and backs off.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::chat::PromptMessage;
use crate::config::AiConfig;
use crate::error::{Error, Result};

/// One dice roll the model asks the players for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceRequest {
    pub request_id: String,
    pub character_ids: Vec<String>,
    /// Dice expression, e.g. `1d20`
    pub dice_type: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
}

/// Structured response from one AI round-trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub narrative: String,
    #[serde(default)]
    pub dice_requests: Vec<DiceRequest>,
    /// Opaque state-update commands consumed by the state processor
    #[serde(default)]
    pub game_state_updates: Vec<Value>,
    #[serde(default)]
    pub end_turn: bool,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// The silent rate-limit signature: the prompt was processed but no
    /// completion was generated
    pub fn looks_rate_limited(self) -> bool {
        self.completion_tokens == 0 && self.prompt_tokens > 0
    }
}

/// Raw outcome of one transport attempt
#[derive(Debug, Clone)]
pub struct AiCompletion {
    pub response: Option<AiResponse>,
    pub usage: Option<TokenUsage>,
}

/// Transport trait implemented by the host's AI service
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<AiCompletion>;
}

/// Wraps a client with timeout, empty-response retries, and rate-limit
/// backoff. After exhausting retries, returns `Ok(None)` and lets the
/// caller decide user-visible messaging.
pub struct RetryingAiClient<C> {
    inner: C,
    config: AiConfig,
}

impl<C: AiClient> RetryingAiClient<C> {
    pub fn new(inner: C, config: AiConfig) -> Self {
        Self { inner, config }
    }

    pub async fn get_response(&self, messages: &[PromptMessage]) -> Result<Option<AiResponse>> {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let mut delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let attempts = self.config.max_retries.max(1);

        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(timeout, self.inner.complete(messages)).await;

            match outcome {
                Err(_) => {
                    warn!(attempt, "AI request timed out");
                    if attempt == attempts {
                        return Err(Error::Timeout);
                    }
                }
                Ok(Err(e)) if e.is_recoverable() => {
                    warn!(attempt, "AI request failed, will retry: {e}");
                    if attempt == attempts {
                        return Err(e);
                    }
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(completion)) => {
                    if let Some(usage) = completion.usage {
                        if usage.looks_rate_limited() {
                            warn!(
                                attempt,
                                prompt_tokens = usage.prompt_tokens,
                                "rate limiting detected: prompt processed to zero completion tokens"
                            );
                            if attempt == attempts {
                                break;
                            }
                            tokio::time::sleep(delay).await;
                            delay *= 2;
                            continue;
                        }
                    }
                    match completion.response {
                        Some(response) => return Ok(Some(response)),
                        None => {
                            warn!(attempt, "AI returned empty response content");
                            if attempt == attempts {
                                break;
                            }
                        }
                    }
                }
            }

            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        error!(
            attempts,
            "all attempts failed to produce a valid AI response"
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedClient {
        calls: Arc<AtomicUsize>,
        completions: Vec<AiCompletion>,
    }

    #[async_trait]
    impl AiClient for ScriptedClient {
        async fn complete(&self, _messages: &[PromptMessage]) -> Result<AiCompletion> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.completions[n.min(self.completions.len() - 1)].clone())
        }
    }

    fn fast_config() -> AiConfig {
        AiConfig {
            max_retries: 3,
            retry_base_delay_ms: 1,
            request_timeout_secs: 5,
            ..AiConfig::default()
        }
    }

    fn narrative(text: &str) -> AiCompletion {
        AiCompletion {
            response: Some(AiResponse {
                narrative: text.into(),
                dice_requests: vec![],
                game_state_updates: vec![],
                end_turn: true,
            }),
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            }),
        }
    }

    fn empty() -> AiCompletion {
        AiCompletion {
            response: None,
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 0,
            }),
        }
    }

    #[tokio::test]
    async fn retries_after_rate_limited_empty_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = ScriptedClient {
            calls: Arc::clone(&calls),
            completions: vec![empty(), narrative("The orc snarls.")],
        };
        let retrying = RetryingAiClient::new(client, fast_config());

        let response = retrying.get_response(&[]).await.unwrap();
        assert_eq!(response.unwrap().narrative, "The orc snarls.");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_return_none() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = ScriptedClient {
            calls: Arc::clone(&calls),
            completions: vec![empty()],
        };
        let retrying = RetryingAiClient::new(client, fast_config());

        let response = retrying.get_response(&[]).await.unwrap();
        assert!(response.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unrecoverable_errors_propagate_immediately() {
        struct FailingClient;

        #[async_trait]
        impl AiClient for FailingClient {
            async fn complete(&self, _messages: &[PromptMessage]) -> Result<AiCompletion> {
                Err(Error::InvalidArgument("malformed request".into()))
            }
        }

        let retrying = RetryingAiClient::new(FailingClient, fast_config());
        let result = retrying.get_response(&[]).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rate_limit_signature_detection() {
        assert!(TokenUsage {
            prompt_tokens: 500,
            completion_tokens: 0
        }
        .looks_rate_limited());
        assert!(!TokenUsage {
            prompt_tokens: 0,
            completion_tokens: 0
        }
        .looks_rate_limited());
        assert!(!TokenUsage {
            prompt_tokens: 500,
            completion_tokens: 20
        }
        .looks_rate_limited());
    }

    #[test]
    fn response_parses_with_defaults() {
        let response: AiResponse =
            serde_json::from_str(r#"{"narrative": "You enter the crypt."}"#).unwrap();
        assert!(response.dice_requests.is_empty());
        assert!(!response.end_turn);
    }
}
