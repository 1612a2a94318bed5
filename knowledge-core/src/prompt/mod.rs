//! Token-aware prompt assembly
//!
//! Builds the ordered message list for the AI client: system prompt,
//! budget-trimmed older history, static and dynamic context blocks, the
//! retrieval context, the recent-history window, and an optional trailing
//! instruction. Older history is trimmed oldest-first and messages are
//! never split.

pub mod format;
pub mod tokens;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chat::{ChatMessage, PromptMessage, Role};
use crate::config::PromptConfig;
use crate::retrieval::RetrievalOrchestrator;
use crate::state::GameState;

/// Fixed system prompt framing the AI as the game master
pub const SYSTEM_PROMPT: &str = "\
You are the Game Master of a tabletop fantasy role-playing campaign. \
Narrate the world vividly and fairly, adjudicate actions using the rules \
context provided, and keep the story moving. When an action's outcome is \
uncertain, request the appropriate dice rolls instead of deciding the \
result yourself. Stay consistent with the campaign state you are given: \
the party roster, location, combat order, quests, and prior events. \
Respond with your structured output format: a narrative, any dice \
requests, game state updates, and whether the turn ends.";

pub struct PromptAssembler {
    orchestrator: Arc<RetrievalOrchestrator>,
    config: PromptConfig,
}

impl PromptAssembler {
    pub fn new(orchestrator: Arc<RetrievalOrchestrator>, config: PromptConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Build the message list for one AI round-trip.
    ///
    /// A non-null `player_action` marks a new turn: the cached retrieval
    /// context is cleared and retrieval runs fresh. A null action is a
    /// continuation (e.g. after dice submission) and reuses the cached
    /// context verbatim without touching the orchestrator.
    pub async fn build(
        &self,
        state: &mut GameState,
        player_action: Option<&str>,
        instruction: Option<&str>,
    ) -> Vec<PromptMessage> {
        let system = PromptMessage::new(Role::System, SYSTEM_PROMPT);

        // Split history into the older block and the recent window
        let history = &state.chat_history;
        let recent_count = self.config.recent_history_messages.min(history.len());
        let split_at = history.len() - recent_count;
        let (main_block, recent_block) = history.split_at(split_at);

        let main_history: Vec<PromptMessage> =
            main_block.iter().filter_map(convert_message).collect();
        let recent_history: Vec<PromptMessage> =
            recent_block.iter().filter_map(convert_message).collect();

        let static_message = PromptMessage::new(
            Role::User,
            format!("CONTEXT INJECTION:\n{}", format::static_context(state)),
        );
        let dynamic_message = PromptMessage::new(
            Role::User,
            format!("CURRENT STATUS:\n{}", format::dynamic_context(state)),
        );

        let rag_content = self.resolve_rag_context(state, player_action).await;
        let rag_message = rag_content.map(|content| PromptMessage::new(Role::User, content));

        let instruction_message = instruction
            .filter(|text| !text.trim().is_empty())
            .map(|text| PromptMessage::new(Role::User, text));

        // Cost the fixed slots, then trim the older history to what remains
        let overhead = self.config.tokens_per_message_overhead;
        let mut fixed_tokens = tokens::count_message(&system, overhead)
            + tokens::count_message(&static_message, overhead)
            + tokens::count_message(&dynamic_message, overhead);
        if let Some(msg) = &rag_message {
            fixed_tokens += tokens::count_message(msg, overhead);
        }
        for msg in &recent_history {
            fixed_tokens += tokens::count_message(msg, overhead);
        }
        if let Some(msg) = &instruction_message {
            fixed_tokens += tokens::count_message(msg, overhead);
        }

        let remaining_budget = self.config.max_tokens_budget.saturating_sub(fixed_tokens);
        let trimmed_main = self.trim_main_history(main_history, remaining_budget);

        let mut messages = Vec::with_capacity(trimmed_main.len() + recent_history.len() + 5);
        messages.push(system);
        messages.extend(trimmed_main);
        messages.push(static_message);
        messages.push(dynamic_message);
        if let Some(msg) = rag_message {
            messages.push(msg);
        }
        messages.extend(recent_history);
        if let Some(msg) = instruction_message {
            messages.push(msg);
        }

        let total_tokens: usize = messages
            .iter()
            .map(|m| tokens::count_message(m, overhead))
            .sum();
        info!(
            messages = messages.len(),
            total_tokens, "assembled AI prompt"
        );

        messages
    }

    /// Apply the single-slot context-cache semantics
    async fn resolve_rag_context(
        &self,
        state: &mut GameState,
        player_action: Option<&str>,
    ) -> Option<String> {
        match player_action {
            Some(action) => {
                state.clear_rag_context();
                let results = self.orchestrator.retrieve(action, state).await;
                if results.has_results() {
                    let formatted = RetrievalOrchestrator::format_for_prompt(&results);
                    state.last_rag_context = Some(formatted.clone());
                    Some(formatted)
                } else {
                    None
                }
            }
            None => {
                let cached = state.last_rag_context.clone();
                if cached.is_some() {
                    info!("reusing cached retrieval context for continuation");
                }
                cached
            }
        }
    }

    /// Keep the largest suffix of older history that fits the remaining
    /// budget; with no tokenizer, fall back to a message-count cap
    fn trim_main_history(
        &self,
        main_history: Vec<PromptMessage>,
        remaining_budget: usize,
    ) -> Vec<PromptMessage> {
        if main_history.is_empty() {
            return main_history;
        }

        if !tokens::available() {
            let keep = self.config.fallback_history_messages.min(main_history.len());
            let dropped = main_history.len() - keep;
            if dropped > 0 {
                warn!(
                    dropped,
                    "tokenizer unavailable; trimming history by message count"
                );
            }
            let start = main_history.len() - keep;
            return main_history[start..].to_vec();
        }

        let overhead = self.config.tokens_per_message_overhead;
        let original = main_history.len();
        let mut kept: Vec<PromptMessage> = Vec::new();
        let mut used = 0usize;
        for message in main_history.into_iter().rev() {
            let cost = tokens::count_message(&message, overhead);
            if used + cost > remaining_budget {
                break;
            }
            used += cost;
            kept.push(message);
        }
        kept.reverse();

        let dropped = original - kept.len();
        if dropped > 0 {
            debug!(dropped, used, remaining_budget, "trimmed older history");
        }
        kept
    }
}

/// Convert one chat-history entry into a prompt message.
///
/// Assistant messages prefer their stored structured response; operator
/// error diagnostics and empty messages are dropped.
fn convert_message(msg: &ChatMessage) -> Option<PromptMessage> {
    if msg.is_error_diagnostic() {
        debug!("excluding system error diagnostic from prompt");
        return None;
    }

    let content = if msg.role == Role::Assistant {
        msg.ai_response_json
            .as_deref()
            .filter(|json| !json.trim().is_empty())
            .unwrap_or(&msg.content)
            .to_string()
    } else {
        msg.content.clone()
    };

    if content.trim().is_empty() {
        warn!(role = msg.role.as_str(), "skipping history message with empty content");
        return None;
    }

    Some(PromptMessage::new(msg.role, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::catalog::EntityKind;
    use crate::config::RetrievalConfig;
    use crate::embeddings::{HashEmbedder, SharedEmbedder};
    use crate::error::Result;
    use crate::kb::{CatalogSearch, KnowledgeBaseManager, ScoredRow};

    /// Counts catalog searches so tests can assert the orchestrator was not
    /// re-invoked on continuations
    struct CountingCatalog {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CatalogSearch for CountingCatalog {
        async fn search_kind(
            &self,
            kind: EntityKind,
            _query: &[f32],
            _k: usize,
        ) -> Result<Vec<ScoredRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if kind == EntityKind::Monsters {
                Ok(vec![ScoredRow {
                    index: "orc".into(),
                    name: "Orc".into(),
                    content: "Monster: Orc Type: humanoid CR: 0.5 HP: 15".into(),
                    distance: 0.1,
                }])
            } else {
                Ok(vec![])
            }
        }
    }

    fn assembler(calls: Arc<AtomicUsize>) -> PromptAssembler {
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new("hash-stub".into(), 64));
        let kb = Arc::new(KnowledgeBaseManager::new(
            Arc::new(CountingCatalog { calls }),
            embedder,
        ));
        let config = RetrievalConfig {
            score_threshold: 0.0,
            ..RetrievalConfig::default()
        };
        let orchestrator = Arc::new(RetrievalOrchestrator::new(kb, config));
        PromptAssembler::new(orchestrator, PromptConfig::default())
    }

    fn assembler_with_config(config: PromptConfig) -> PromptAssembler {
        let calls = Arc::new(AtomicUsize::new(0));
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new("hash-stub".into(), 64));
        let kb = Arc::new(KnowledgeBaseManager::new(
            Arc::new(CountingCatalog { calls }),
            embedder,
        ));
        let orchestrator = Arc::new(RetrievalOrchestrator::new(kb, RetrievalConfig::default()));
        PromptAssembler::new(orchestrator, config)
    }

    #[tokio::test]
    async fn continuation_reuses_cached_context_without_retrieval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let asm = assembler(Arc::clone(&calls));
        let mut state = GameState::new("c1");

        let first = asm.build(&mut state, Some("I attack the orc"), None).await;
        let calls_after_first = calls.load(Ordering::SeqCst);
        assert!(calls_after_first > 0);
        let context_a = state.last_rag_context.clone().expect("context cached");
        assert!(first.iter().any(|m| m.content == context_a));

        // Continuation: no action, no new retrieval, identical context
        let second = asm.build(&mut state, None, None).await;
        assert_eq!(calls.load(Ordering::SeqCst), calls_after_first);
        let reused: Vec<&PromptMessage> =
            second.iter().filter(|m| m.content == context_a).collect();
        assert_eq!(reused.len(), 1);
    }

    #[tokio::test]
    async fn new_action_clears_and_replaces_cached_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let asm = assembler(Arc::clone(&calls));
        let mut state = GameState::new("c1");
        state.last_rag_context = Some("stale context".into());

        asm.build(&mut state, Some("I attack the orc"), None).await;
        let cached = state.last_rag_context.clone().expect("fresh context");
        assert_ne!(cached, "stale context");
        assert!(cached.contains("Orc"));
    }

    #[tokio::test]
    async fn error_diagnostics_are_excluded_but_other_history_kept_in_order() {
        let asm = assembler(Arc::new(AtomicUsize::new(0)));
        let mut state = GameState::new("c1");
        state.chat_history = vec![
            ChatMessage::user("Hello there"),
            ChatMessage::system_error("parse failed"),
            ChatMessage::assistant("The innkeeper waves back."),
        ];

        let messages = asm.build(&mut state, None, None).await;
        assert!(!messages
            .iter()
            .any(|m| m.content.contains("(Error: parse failed)")));

        let hello = messages
            .iter()
            .position(|m| m.content == "Hello there")
            .expect("user message kept");
        let reply = messages
            .iter()
            .position(|m| m.content == "The innkeeper waves back.")
            .expect("assistant message kept");
        assert!(hello < reply);
    }

    #[tokio::test]
    async fn assistant_messages_prefer_structured_response() {
        let asm = assembler(Arc::new(AtomicUsize::new(0)));
        let mut state = GameState::new("c1");
        let mut msg = ChatMessage::assistant("A goblin leaps out!");
        msg.ai_response_json = Some(r#"{"narrative":"A goblin leaps out!"}"#.to_string());
        state.chat_history.push(msg);

        let messages = asm.build(&mut state, None, None).await;
        assert!(messages
            .iter()
            .any(|m| m.content == r#"{"narrative":"A goblin leaps out!"}"#));
        assert!(!messages.iter().any(|m| m.content == "A goblin leaps out!"));
    }

    #[tokio::test]
    async fn token_budget_trims_oldest_history_first() {
        if !tokens::available() {
            return;
        }
        let config = PromptConfig {
            max_tokens_budget: 400,
            recent_history_messages: 2,
            ..PromptConfig::default()
        };
        let asm = assembler_with_config(config.clone());
        let mut state = GameState::new("c1");
        for i in 0..40 {
            state
                .chat_history
                .push(ChatMessage::user(format!("turn {i}: the party debates its next move at length")));
        }

        let messages = asm.build(&mut state, None, None).await;

        // Recent window survives in full
        assert!(messages.iter().any(|m| m.content.contains("turn 39")));
        assert!(messages.iter().any(|m| m.content.contains("turn 38")));
        // The oldest message is dropped before newer ones
        assert!(!messages.iter().any(|m| m.content.contains("turn 0:")));

        let overhead = config.tokens_per_message_overhead;
        let total: usize = messages
            .iter()
            .map(|m| tokens::count_message(m, overhead))
            .sum();
        assert!(total <= config.max_tokens_budget, "total {total} over budget");

        // Kept history is contiguous from the end: no gaps
        let kept: Vec<usize> = (0..40)
            .filter(|i| messages.iter().any(|m| m.content.starts_with(&format!("turn {i}:"))))
            .collect();
        for pair in kept.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[tokio::test]
    async fn budget_smaller_than_fixed_slots_still_succeeds() {
        let config = PromptConfig {
            max_tokens_budget: 10,
            ..PromptConfig::default()
        };
        let asm = assembler_with_config(config);
        let mut state = GameState::new("c1");
        for i in 0..10 {
            state.chat_history.push(ChatMessage::user(format!("message {i}")));
        }

        let messages = asm.build(&mut state, None, None).await;
        // System prompt and context blocks are always present
        assert_eq!(messages[0].role, Role::System);
        assert!(messages.iter().any(|m| m.content.starts_with("CONTEXT INJECTION:")));
        assert!(messages.iter().any(|m| m.content.starts_with("CURRENT STATUS:")));
        if tokens::available() {
            // Older history beyond the recent window was trimmed away
            assert!(!messages.iter().any(|m| m.content == "message 0"));
        }
    }

    #[tokio::test]
    async fn trailing_instruction_lands_last() {
        let asm = assembler(Arc::new(AtomicUsize::new(0)));
        let mut state = GameState::new("c1");
        let messages = asm
            .build(&mut state, None, Some("Narrate the NPC turn."))
            .await;
        assert_eq!(
            messages.last().map(|m| m.content.as_str()),
            Some("Narrate the NPC turn.")
        );
    }
}
