pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod router;
pub mod search;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
pub use chat::{ChatEngine, ChatReply, ChatRequest, ReplyIntent, ReplyMetadata};
pub use config::AssistantConfig;
pub use context::SystemContext;
pub use error::{BackendError, FallbackReason, InvalidArguments, StorageError};
pub use knowledge::{KnowledgeBase, KnowledgeItem};
pub use router::{route, FunctionCall, Intent, RouteDecision};
pub use search::{normalize, ExtractedCriteria, QueryBuilder, QueryPlan};
pub use storage::{InMemoryStore, MarketplaceStore, SeedData};
pub use types::{ConversationTurn, EntityKind, TurnRole, UserRole};

// Re-export LLM types
pub use llm::{
    ApiProvider, ChatMessage, ChatResponse, GenerationConfig, LLMConfig, LLMManager, LLMMode,
    LLMProvider, ProviderInfo, ToolChoice,
};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
