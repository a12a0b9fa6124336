use serde::{Deserialize, Serialize};
use std::fmt;

/// Who spoke a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of the conversation, supplied by the caller on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Role of the account making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Guest,
    Student,
    Parent,
    Tutor,
    Admin,
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Guest => "khách",
            Self::Student => "học viên",
            Self::Parent => "phụ huynh",
            Self::Tutor => "gia sư",
            Self::Admin => "quản trị viên",
        }
    }
}

/// Entity kinds the live counters are computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tutor,
    Student,
    Course,
    BlogPost,
    Booking,
    Review,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Tutor,
        Self::Student,
        Self::Course,
        Self::BlogPost,
        Self::Booking,
        Self::Review,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tutor => "gia sư",
            Self::Student => "học viên",
            Self::Course => "khóa học",
            Self::BlogPost => "bài viết",
            Self::Booking => "lượt đặt lịch",
            Self::Review => "đánh giá",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
