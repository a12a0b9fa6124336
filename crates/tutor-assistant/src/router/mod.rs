//! Function-calling Intent Router
//!
//! One backend call with the function catalog decides whether the utterance is
//! a structured request (tutor/course/blog search, help topic) or something to
//! answer from the knowledge base. The router never fails: an unconfigured or
//! failing backend is reported as `RouteDecision::Unavailable` and the caller
//! takes the offline path.

pub mod functions;
pub mod intent;

use serde::Serialize;
use std::time::Instant;

use crate::context::{build_context, SystemContext};
use crate::error::FallbackReason;
use crate::llm::{ChatMessage, ChatResponse, LLMManager};
use crate::types::ConversationTurn;

pub use functions::{FunctionSpec, GET_HELP, SEARCH_BLOG, SEARCH_COURSES, SEARCH_TUTORS};
pub use intent::{
    parse_intent, BlogSearchArgs, CourseSearchArgs, FunctionCall, HelpArgs, HelpTopic, Intent,
    TutorSearchArgs,
};

const ROUTER_SYSTEM_PROMPT: &str = "Bạn là trợ lý của một nền tảng kết nối gia sư và học viên. \
Nếu người dùng muốn tìm gia sư, khóa học hoặc bài viết, hãy gọi hàm tìm kiếm tương ứng với các \
tham số trích từ câu hỏi (học phí tính bằng VND, ví dụ 300k = 300000). Nếu người dùng hỏi cách \
đặt lịch, thanh toán, hủy lịch, trở thành gia sư hoặc về tài khoản, hãy gọi get_help với chủ đề \
phù hợp. Chỉ trả lời bằng văn bản khi không hàm nào phù hợp. Không bịa thông tin về gia sư.";

/// Outcome of one routing attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteDecision {
    /// The backend asked for a function; arguments are not validated yet.
    FunctionCall(FunctionCall),
    /// The backend answered in prose instead of calling a function.
    FreeText { text: String },
    /// No backend, or the call failed; nothing was decided.
    Unavailable { reason: FallbackReason },
}

impl RouteDecision {
    pub fn function_call(&self) -> Option<&FunctionCall> {
        match self {
            Self::FunctionCall(call) => Some(call),
            _ => None,
        }
    }
}

/// Messages sent to the backend: routing instructions, the bounded context and
/// the current utterance.
pub fn build_router_messages(
    utterance: &str,
    history: &[ConversationTurn],
    system: &SystemContext,
    max_turns: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(ROUTER_SYSTEM_PROMPT)];
    messages.extend(build_context(history, system, max_turns));
    messages.push(ChatMessage::user(utterance));
    messages
}

/// Route an utterance. Exactly one backend call, no retries.
pub async fn route(
    utterance: &str,
    history: &[ConversationTurn],
    system: &SystemContext,
    llm: &LLMManager,
    max_turns: usize,
) -> RouteDecision {
    if !llm.is_available() {
        tracing::info!("Backend not configured, skipping intent routing");
        return RouteDecision::Unavailable {
            reason: FallbackReason::BackendUnavailable,
        };
    }

    let messages = build_router_messages(utterance, history, system, max_turns);
    let tools = functions::tool_schemas();

    let start = Instant::now();
    let result = llm.chat(&messages, &tools).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(ChatResponse::ToolCalls(mut calls)) if !calls.is_empty() => {
            if calls.len() > 1 {
                tracing::debug!(count = calls.len(), "Backend returned several calls, using the first");
            }
            let call = calls.swap_remove(0);
            tracing::info!(
                function = %call.name,
                arguments = %call.arguments,
                latency_ms = latency_ms,
                "Router decision: function call"
            );
            RouteDecision::FunctionCall(FunctionCall {
                name: call.name,
                arguments: call.arguments,
            })
        }
        Ok(ChatResponse::ToolCalls(_)) => {
            tracing::info!(latency_ms = latency_ms, "Router decision: empty call list");
            RouteDecision::FreeText {
                text: String::new(),
            }
        }
        Ok(ChatResponse::Content(text)) => {
            tracing::info!(latency_ms = latency_ms, chars = text.len(), "Router decision: free text");
            RouteDecision::FreeText { text }
        }
        Err(e) if e.is_unavailable() => {
            tracing::info!("Backend unavailable, skipping intent routing");
            RouteDecision::Unavailable {
                reason: FallbackReason::BackendUnavailable,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, latency_ms = latency_ms, "Router call failed");
            RouteDecision::Unavailable {
                reason: FallbackReason::BackendFailed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::llm::testing::scripted_manager;
    use crate::llm::{ChatRole, ToolCall};
    use crate::types::{EntityKind, UserRole};

    fn ctx() -> SystemContext {
        SystemContext::new(UserRole::Student).with_count(EntityKind::Tutor, 12)
    }

    fn tool_call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    #[tokio::test]
    async fn test_structured_call_passes_through_unvalidated() {
        let (llm, _) = scripted_manager(vec![Ok(ChatResponse::ToolCalls(vec![tool_call(
            "search_tutors",
            r#"{"min_rating": 42}"#,
        )]))]);
        let decision = route("tìm gia sư", &[], &ctx(), &llm, 6).await;
        let call = decision.function_call().unwrap();
        assert_eq!(call.name, SEARCH_TUTORS);
        assert_eq!(call.arguments, r#"{"min_rating": 42}"#);
    }

    #[tokio::test]
    async fn test_free_text() {
        let (llm, _) = scripted_manager(vec![Ok(ChatResponse::Content("Chào bạn!".into()))]);
        assert_eq!(
            route("xin chào", &[], &ctx(), &llm, 6).await,
            RouteDecision::FreeText {
                text: "Chào bạn!".into()
            }
        );
    }

    #[tokio::test]
    async fn test_failures_become_unavailable() {
        let (llm, calls) = scripted_manager(vec![Err(BackendError::Api {
            status: 500,
            body: "boom".into(),
        })]);
        assert_eq!(
            route("xin chào", &[], &ctx(), &llm, 6).await,
            RouteDecision::Unavailable {
                reason: FallbackReason::BackendFailed
            }
        );
        // no retry
        assert_eq!(calls.lock().unwrap().len(), 1);

        assert_eq!(
            route("xin chào", &[], &ctx(), &LLMManager::disabled(), 6).await,
            RouteDecision::Unavailable {
                reason: FallbackReason::BackendUnavailable
            }
        );
    }

    #[tokio::test]
    async fn test_backend_sees_bounded_context() {
        let (llm, calls) = scripted_manager(vec![Ok(ChatResponse::Content(String::new()))]);
        let history: Vec<ConversationTurn> = (0..10)
            .map(|i| ConversationTurn::user(format!("old {}", i)))
            .collect();
        route("câu hỏi mới", &history, &ctx(), &llm, 6).await;

        let calls = calls.lock().unwrap();
        let sent = &calls[0];
        // system prompt + synthetic pair + 6 turns + utterance
        assert_eq!(sent.len(), 1 + 2 + 6 + 1);
        assert_eq!(sent[0].role, ChatRole::System);
        assert!(sent[1].text().contains("12 gia sư"));
        assert_eq!(sent[3].text(), "old 4");
        assert_eq!(sent.last().unwrap().text(), "câu hỏi mới");
        assert!(sent.iter().all(|m| m.text() != "old 3"));
    }
}
