//! Retrieval terms and prompt assembly for context-grounded replies.

use tessera_core::{
  chat::{ChatMessage, ChatRole, PromptMessage},
  intel::Chunk,
};

/// Chunks retrieved per reply.
pub const CONTEXT_CHUNKS: usize = 6;

/// Prior messages sent upstream with each reply.
const HISTORY: usize = 20;

const MAX_TERMS: usize = 8;

const STOP_WORDS: &[&str] = &[
  "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "her", "was", "one",
  "our", "out", "has", "have", "had", "his", "how", "its", "who", "what", "when", "where",
  "which", "why", "with", "this", "that", "from", "they", "will", "would", "there", "their",
  "about", "into", "does", "than", "then", "them", "these", "those",
];

/// Lowercase keywords of `text` for chunk retrieval: words of three or more
/// characters, stop words and repeats dropped.
pub fn search_terms(text: &str) -> Vec<String> {
  let mut terms: Vec<String> = Vec::new();
  for word in text.split(|c: char| !c.is_alphanumeric()) {
    let word = word.to_lowercase();
    if word.chars().count() < 3 || STOP_WORDS.contains(&word.as_str()) || terms.contains(&word) {
      continue;
    }
    terms.push(word);
    if terms.len() == MAX_TERMS {
      break;
    }
  }
  terms
}

/// The system prompt followed by the recent conversation.
pub fn build_prompt(chunks: &[Chunk], history: &[ChatMessage]) -> Vec<PromptMessage> {
  let mut system = String::from(
    "You are the research assistant of a marketing team. Answer clearly and concisely.",
  );
  if !chunks.is_empty() {
    system.push_str(
      " Use the numbered context excerpts below when they are relevant. If they do not \
       contain the answer, say so instead of guessing.\n\nContext:",
    );
    for (i, chunk) in chunks.iter().enumerate() {
      system.push_str(&format!("\n\n[{}] {}", i + 1, chunk.text.trim()));
    }
  }

  let mut messages = vec![PromptMessage { role: ChatRole::System, content: system }];
  let skip = history.len().saturating_sub(HISTORY);
  messages.extend(
    history
      .iter()
      .skip(skip)
      .filter(|m| m.role != ChatRole::System)
      .map(|m| PromptMessage { role: m.role, content: m.content.clone() }),
  );
  messages
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn message(role: ChatRole, content: &str) -> ChatMessage {
    ChatMessage {
      message_id: Uuid::new_v4(),
      conversation_id: Uuid::nil(),
      role,
      content: content.into(),
      model: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn terms_skip_short_and_stop_words() {
    assert_eq!(
      search_terms("What is the pricing of Pet-Insurance, and pricing in 2025?"),
      vec!["pricing", "pet", "insurance", "2025"]
    );
    assert!(search_terms("a an of").is_empty());
  }

  #[test]
  fn prompt_numbers_context_and_keeps_history_order() {
    let chunks = vec![Chunk {
      chunk_id:    Uuid::new_v4(),
      document_id: Uuid::new_v4(),
      ordinal:     0,
      text:        " Claims take 3 days. ".into(),
    }];
    let history = vec![
      message(ChatRole::User, "How fast are claims?"),
      message(ChatRole::Assistant, "Checking."),
      message(ChatRole::User, "And refunds?"),
    ];
    let prompt = build_prompt(&chunks, &history);
    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[0].role, ChatRole::System);
    assert!(prompt[0].content.ends_with("[1] Claims take 3 days."));
    assert_eq!(prompt[3].content, "And refunds?");
  }

  #[test]
  fn prompt_without_context_has_no_excerpts() {
    let prompt = build_prompt(&[], &[message(ChatRole::User, "hi")]);
    assert!(!prompt[0].content.contains("Context:"));
    assert_eq!(prompt.len(), 2);
  }
}
