pub mod composer;
pub mod engine;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::FallbackReason;
use crate::router::FunctionCall;
use crate::types::{ConversationTurn, UserRole};

pub use engine::ChatEngine;

// ============================================================================
// Types
// ============================================================================

/// One caller request. History is supplied on every call; nothing is kept
/// between requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub utterance: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_role: UserRole,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl ChatRequest {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.user_role = role;
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// False only when an unexpected internal fault was caught.
    pub success: bool,
    pub response: String,
    pub metadata: ReplyMetadata,
}

/// Which path produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyIntent {
    SearchTutors,
    SearchCourses,
    SearchBlog,
    Help,
    /// Knowledge-base answer (retrieved, generated or capability summary).
    Knowledge,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCounts {
    /// Rows rendered in this reply.
    pub returned: usize,
    /// Live platform total for the searched entity kind, when it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    pub request_id: Uuid,
    pub intent: ReplyIntent,
    /// The backend's structured call, as received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_counts: Option<ResultCounts>,
    /// The criteria the search actually ran with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria_echoed: Option<JsonValue>,
    /// Knowledge items the answer was grounded on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ReplyMetadata {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            intent: ReplyIntent::Unknown,
            function_call: None,
            result_counts: None,
            criteria_echoed: None,
            knowledge_ids: Vec::new(),
            fallback: None,
            error: None,
            duration_ms: 0,
        }
    }
}

// ============================================================================
// Prompts and fixed texts
// ============================================================================

pub const RAG_SYSTEM_PROMPT: &str = "Bạn là trợ lý hỗ trợ khách hàng của một nền tảng kết nối \
gia sư và học viên. Trả lời ngắn gọn bằng tiếng Việt, chỉ dựa trên các mục hướng dẫn được cung \
cấp. Nếu hướng dẫn không đủ để trả lời, hãy nói rõ và gợi ý liên hệ bộ phận hỗ trợ.";

pub const CAPABILITY_SUMMARY: &str = "Mình là trợ lý của nền tảng gia sư. Mình có thể giúp bạn:\n\
- Tìm gia sư theo môn học, khu vực, học phí, giới tính, kinh nghiệm hoặc đánh giá \
(ví dụ: \"tìm gia sư toán ở Hà Nội dưới 300k\")\n\
- Tìm khóa học và bài viết trên blog\n\
- Hướng dẫn đặt lịch, thanh toán, hủy lịch và đăng ký làm gia sư\n\
Bạn cần hỗ trợ gì?";

pub const SEARCH_FAILED: &str = "Xin lỗi, hiện mình chưa thể tìm kiếm được. \
Bạn vui lòng thử lại sau ít phút nhé.";

pub const APOLOGY: &str = "Xin lỗi, đã có lỗi xảy ra khi xử lý yêu cầu của bạn. \
Bạn vui lòng thử lại sau.";
