//! Context Manager.
//!
//! Builds the prompt history sent to the backend: one synthetic user/assistant
//! pair describing who is asking and what the platform currently holds, then
//! the most recent turns of the caller's history. Older turns are dropped,
//! never summarized. Nothing is stored between requests.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::llm::ChatMessage;
use crate::storage::MarketplaceStore;
use crate::types::{ConversationTurn, EntityKind, TurnRole, UserRole};

/// Most recent caller turns forwarded to the backend.
pub const DEFAULT_MAX_TURNS: usize = 6;

const CONTEXT_ACK: &str = "Đã rõ. Tôi sẽ dựa vào thông tin này khi trả lời.";

/// Per-request snapshot of live platform counters. Never cached.
#[derive(Debug, Clone, Serialize)]
pub struct SystemContext {
    pub counts: BTreeMap<EntityKind, u64>,
    pub role: UserRole,
    pub captured_at: DateTime<Utc>,
}

impl SystemContext {
    pub fn new(role: UserRole) -> Self {
        Self {
            counts: BTreeMap::new(),
            role,
            captured_at: Utc::now(),
        }
    }

    pub fn with_count(mut self, kind: EntityKind, count: u64) -> Self {
        self.counts.insert(kind, count);
        self
    }

    pub fn count(&self, kind: EntityKind) -> Option<u64> {
        self.counts.get(&kind).copied()
    }

    /// "120 gia sư, 45 khóa học" in `EntityKind` order; empty when nothing was counted.
    pub fn counters_line(&self) -> String {
        self.counts
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind.label()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Text of the synthetic leading user turn.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "[Bối cảnh hệ thống] Người dùng hiện tại là {}.",
            self.role.label()
        );
        let counters = self.counters_line();
        if !counters.is_empty() {
            text.push_str(&format!(" Nền tảng hiện có: {}.", counters));
        }
        text.push_str(&format!(
            " Thời điểm: {}.",
            self.captured_at.format("%Y-%m-%d %H:%M UTC")
        ));
        text
    }
}

/// Synthetic context pair followed by the last `max_turns` caller turns.
pub fn build_context(
    history: &[ConversationTurn],
    system: &SystemContext,
    max_turns: usize,
) -> Vec<ChatMessage> {
    let recent = &history[history.len().saturating_sub(max_turns)..];

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatMessage::user(system.describe()));
    messages.push(ChatMessage::assistant(CONTEXT_ACK));
    messages.extend(recent.iter().map(|turn| match turn.role {
        TurnRole::User => ChatMessage::user(turn.content.clone()),
        TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
    }));

    if history.len() > recent.len() {
        tracing::debug!(
            dropped = history.len() - recent.len(),
            kept = recent.len(),
            "Truncated conversation history"
        );
    }

    messages
}

/// Read the live counters for every entity kind. A failed count is logged and
/// left out; it never fails the request.
pub async fn load_system_context(store: &dyn MarketplaceStore, role: UserRole) -> SystemContext {
    let results = join_all(EntityKind::ALL.iter().map(|kind| async move {
        (*kind, store.count_by_kind(*kind).await)
    }))
    .await;

    let mut context = SystemContext::new(role);
    for (kind, result) in results {
        match result {
            Ok(count) => {
                context.counts.insert(kind, count);
            }
            Err(e) => {
                tracing::warn!(kind = ?kind, error = %e, "Failed to count entities for context");
            }
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::llm::ChatRole;
    use crate::search::QueryPlan;
    use crate::storage::JoinedRow;
    use async_trait::async_trait;

    fn history(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("turn {}", i))
                } else {
                    ConversationTurn::assistant(format!("turn {}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_keeps_only_most_recent_turns() {
        let ctx = SystemContext::new(UserRole::Student).with_count(EntityKind::Tutor, 120);
        let messages = build_context(&history(10), &ctx, DEFAULT_MAX_TURNS);

        assert_eq!(messages.len(), 2 + 6);
        assert_eq!(messages[0].role, ChatRole::User);
        assert!(messages[0].text().contains("học viên"));
        assert!(messages[0].text().contains("120 gia sư"));
        assert_eq!(messages[1].role, ChatRole::Assistant);

        let kept: Vec<&str> = messages[2..].iter().map(|m| m.text()).collect();
        assert_eq!(kept, vec!["turn 4", "turn 5", "turn 6", "turn 7", "turn 8", "turn 9"]);
        assert!(messages.iter().all(|m| m.text() != "turn 3"));
    }

    #[test]
    fn test_short_history_is_kept_whole() {
        let ctx = SystemContext::new(UserRole::Guest);
        let messages = build_context(&history(3), &ctx, DEFAULT_MAX_TURNS);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2].text(), "turn 0");
        assert_eq!(messages[3].role, ChatRole::Assistant);

        assert_eq!(build_context(&[], &ctx, DEFAULT_MAX_TURNS).len(), 2);
    }

    struct FlakyStore;

    #[async_trait]
    impl MarketplaceStore for FlakyStore {
        async fn count_by_kind(&self, kind: EntityKind) -> Result<u64, StorageError> {
            match kind {
                EntityKind::Review => Err(StorageError::Query("timeout".into())),
                _ => Ok(7),
            }
        }

        async fn find_many(&self, _plan: &QueryPlan) -> Result<Vec<JoinedRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_count_is_omitted() {
        let ctx = load_system_context(&FlakyStore, UserRole::Parent).await;
        assert_eq!(ctx.count(EntityKind::Tutor), Some(7));
        assert_eq!(ctx.count(EntityKind::Review), None);
        assert_eq!(ctx.counts.len(), EntityKind::ALL.len() - 1);
        assert!(!ctx.describe().contains("đánh giá"));
    }
}
