//! Token counting for prompt budgeting
//!
//! The cl100k byte-pair tokenizer is loaded lazily on first use and shared
//! process-wide. When loading fails, counting returns 0 and the assembler
//! switches to its message-count fallback.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;
use tracing::{info, warn};

use crate::chat::PromptMessage;

static TOKENIZER: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn tokenizer() -> Option<&'static CoreBPE> {
    TOKENIZER
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => {
                info!("cl100k_base tokenizer loaded");
                Some(bpe)
            }
            Err(e) => {
                warn!("could not load cl100k_base tokenizer: {e}; token counting disabled");
                None
            }
        })
        .as_ref()
}

/// Whether token counting is operational
pub fn available() -> bool {
    tokenizer().is_some()
}

/// Token count of a text, 0 when the tokenizer is unavailable
pub fn count_text(text: &str) -> usize {
    tokenizer().map_or(0, |bpe| bpe.encode_with_special_tokens(text).len())
}

/// Token count of one prompt message including the per-message overhead,
/// 0 when the tokenizer is unavailable
pub fn count_message(message: &PromptMessage, overhead: usize) -> usize {
    match tokenizer() {
        Some(bpe) => bpe.encode_with_special_tokens(&message.content).len() + overhead,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn counting_is_consistent_with_availability() {
        let message = PromptMessage::new(Role::User, "I attack the goblin with my sword.");
        let count = count_message(&message, 4);
        if available() {
            assert!(count > 4);
            assert_eq!(count, count_text(&message.content) + 4);
        } else {
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn longer_text_never_counts_fewer_tokens() {
        let short = count_text("goblin");
        let long = count_text("goblin goblin goblin goblin goblin");
        assert!(long >= short);
    }
}
