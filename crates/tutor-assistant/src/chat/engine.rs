use anyhow::{Context, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::context::{load_system_context, SystemContext};
use crate::error::FallbackReason;
use crate::knowledge::KnowledgeBase;
use crate::llm::LLMManager;
use crate::router::{self, parse_intent, Intent, RouteDecision};
use crate::search::normalizer::contains_phrase;
use crate::search::{
    extract, extract_blog_criteria, extract_course_criteria, normalize, QueryBuilder,
};
use crate::storage::MarketplaceStore;
use crate::types::EntityKind;

use super::composer;
use super::{
    ChatReply, ChatRequest, ReplyIntent, ReplyMetadata, ResultCounts, APOLOGY,
    CAPABILITY_SUMMARY, SEARCH_FAILED,
};

/// Words that mark an utterance as a search request when routing offline.
const SEARCH_VERBS: &[&str] = &[
    "tìm", "kiếm", "cần gia sư", "muốn học", "find", "search", "looking for",
];

/// Entity markers that send an offline search to courses or the blog instead of tutors.
const COURSE_MARKERS: &[&str] = &["khóa học", "course", "courses"];
const BLOG_MARKERS: &[&str] = &["bài viết", "blog", "article", "articles", "post", "posts"];

pub struct ChatEngine {
    llm: Arc<LLMManager>,
    store: Arc<dyn MarketplaceStore>,
    knowledge: Arc<KnowledgeBase>,
    builder: QueryBuilder,
    history_turns: usize,
    retrieval_top_k: usize,
    offline_search_fallback: bool,
}

impl ChatEngine {
    pub fn new(
        config: &AssistantConfig,
        llm: Arc<LLMManager>,
        store: Arc<dyn MarketplaceStore>,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self {
            llm,
            store,
            knowledge,
            builder: QueryBuilder::new(config.search.limit),
            history_turns: config.routing.history_turns,
            retrieval_top_k: config.retrieval.top_k,
            offline_search_fallback: config.routing.offline_search_fallback,
        }
    }

    /// Build the backend and knowledge base described by `config`.
    pub fn from_config(config: &AssistantConfig, store: Arc<dyn MarketplaceStore>) -> Result<Self> {
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid assistant configuration")?;

        let mut llm = LLMManager::new(config.llm_config());
        llm.initialize().context("Failed to initialize generative backend")?;

        let knowledge = match &config.knowledge.catalog_path {
            Some(path) => Arc::new(KnowledgeBase::from_file(path)?),
            None => KnowledgeBase::shared_builtin(),
        };

        tracing::info!(
            backend = llm.info().map(|i| i.name).unwrap_or_else(|| "disabled".to_string()),
            knowledge_items = knowledge.len(),
            "Chat engine ready"
        );

        Ok(Self::new(config, Arc::new(llm), store, knowledge))
    }

    /// Main entry point. Never fails: unexpected errors and panics are caught
    /// here, logged, and turned into an apology with `success = false`.
    pub async fn chat(&self, request: ChatRequest) -> ChatReply {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();
        let span = tracing::info_span!(
            "chat",
            request_id = %request_id,
            role = ?request.user_role,
            user_id = request.user_id.as_deref().unwrap_or("-")
        );

        let outcome = AssertUnwindSafe(self.process_message(&request, request_id))
            .catch_unwind()
            .instrument(span)
            .await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(mut reply)) => {
                reply.metadata.duration_ms = duration_ms;
                tracing::info!(
                    request_id = %request_id,
                    intent = ?reply.metadata.intent,
                    fallback = ?reply.metadata.fallback,
                    result_count = reply.metadata.result_counts.map(|c| c.returned),
                    latency_ms = duration_ms,
                    "Chat request handled"
                );
                reply
            }
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, error = ?e, "Chat request failed");
                Self::apology(request_id, duration_ms)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(request_id = %request_id, panic = %message, "Chat request panicked");
                Self::apology(request_id, duration_ms)
            }
        }
    }

    fn apology(request_id: Uuid, duration_ms: u64) -> ChatReply {
        let mut metadata = ReplyMetadata::new(request_id);
        metadata.error = Some("internal_error".to_string());
        metadata.duration_ms = duration_ms;
        ChatReply {
            success: false,
            response: APOLOGY.to_string(),
            metadata,
        }
    }

    async fn process_message(&self, request: &ChatRequest, request_id: Uuid) -> Result<ChatReply> {
        let mut metadata = ReplyMetadata::new(request_id);
        let normalized = normalize(&request.utterance);

        if normalized.is_empty() {
            metadata.intent = ReplyIntent::Knowledge;
            return Ok(Self::reply(CAPABILITY_SUMMARY.to_string(), metadata));
        }

        // 1. Live counters for the context and the closing lines
        let system = load_system_context(self.store.as_ref(), request.user_role).await;

        // 2. Route (never fails)
        let decision = router::route(
            &request.utterance,
            &request.history,
            &system,
            &self.llm,
            self.history_turns,
        )
        .await;

        // 3. Dispatch
        let response = match decision {
            RouteDecision::FunctionCall(call) => {
                let intent = match parse_intent(&call) {
                    Ok(intent) => Some(intent),
                    Err(e) => {
                        tracing::warn!(function = %call.name, error = %e, "Invalid function arguments");
                        metadata.fallback = Some(FallbackReason::InvalidArguments);
                        Self::extractor_only(&call.name)
                    }
                };
                metadata.function_call = Some(call);
                match intent {
                    Some(intent) => self.dispatch(intent, &normalized, &system, &mut metadata).await,
                    None => {
                        self.answer_from_knowledge(&request.utterance, &normalized, &system, true, &mut metadata)
                            .await
                    }
                }
            }
            RouteDecision::FreeText { .. } => {
                self.answer_from_knowledge(&request.utterance, &normalized, &system, true, &mut metadata)
                    .await
            }
            RouteDecision::Unavailable { reason } => {
                metadata.fallback = Some(reason);
                let offline_search = if self.offline_search_fallback {
                    Self::offline_search_intent(&normalized)
                } else {
                    None
                };
                if let Some(intent) = offline_search {
                    tracing::info!(function = intent.name(), "Offline routing: dispatching search");
                    self.dispatch(intent, &normalized, &system, &mut metadata).await
                } else {
                    self.answer_from_knowledge(&request.utterance, &normalized, &system, false, &mut metadata)
                        .await
                }
            }
        };

        Ok(Self::reply(response, metadata))
    }

    fn reply(response: String, metadata: ReplyMetadata) -> ChatReply {
        ChatReply {
            success: true,
            response,
            metadata,
        }
    }

    /// For a search call with unusable arguments, run the same search on the
    /// extractor's criteria alone.
    fn extractor_only(function: &str) -> Option<Intent> {
        match function {
            router::SEARCH_TUTORS => Some(Intent::SearchTutors(Default::default())),
            router::SEARCH_COURSES => Some(Intent::SearchCourses(Default::default())),
            router::SEARCH_BLOG => Some(Intent::SearchBlog(Default::default())),
            _ => None,
        }
    }

    /// Deterministic stand-in for the router: a search verb plus something to
    /// search by. Course and blog markers pick those searches; tutors otherwise.
    fn offline_search_intent(normalized: &str) -> Option<Intent> {
        let mentions = |words: &[&str]| words.iter().any(|w| contains_phrase(normalized, w));
        if !mentions(SEARCH_VERBS) {
            return None;
        }

        if mentions(COURSE_MARKERS) {
            (extract_course_criteria(normalized) != Default::default())
                .then(|| Intent::SearchCourses(Default::default()))
        } else if mentions(BLOG_MARKERS) {
            (extract_blog_criteria(normalized) != Default::default())
                .then(|| Intent::SearchBlog(Default::default()))
        } else {
            (!extract(normalized).is_empty()).then(|| Intent::SearchTutors(Default::default()))
        }
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    async fn dispatch(
        &self,
        intent: Intent,
        normalized: &str,
        system: &SystemContext,
        metadata: &mut ReplyMetadata,
    ) -> String {
        match intent {
            Intent::SearchTutors(args) => {
                metadata.intent = ReplyIntent::SearchTutors;
                let criteria = args.merge_into(extract(normalized));
                metadata.criteria_echoed = serde_json::to_value(&criteria).ok();
                let plan = self.builder.build(&criteria);
                let total = system.count(EntityKind::Tutor);
                match self.store.find_many(&plan).await {
                    Ok(rows) => {
                        metadata.result_counts = Some(ResultCounts {
                            returned: rows.len(),
                            platform_total: total,
                        });
                        composer::render_tutor_results(&rows, &criteria, total)
                    }
                    Err(e) => Self::search_failed(&e, metadata),
                }
            }
            Intent::SearchCourses(args) => {
                metadata.intent = ReplyIntent::SearchCourses;
                let criteria = args.merge_into(extract_course_criteria(normalized));
                metadata.criteria_echoed = serde_json::to_value(&criteria).ok();
                let plan = self.builder.build_course_plan(&criteria);
                let total = system.count(EntityKind::Course);
                match self.store.find_many(&plan).await {
                    Ok(rows) => {
                        metadata.result_counts = Some(ResultCounts {
                            returned: rows.len(),
                            platform_total: total,
                        });
                        composer::render_course_results(&rows, &criteria, total)
                    }
                    Err(e) => Self::search_failed(&e, metadata),
                }
            }
            Intent::SearchBlog(args) => {
                metadata.intent = ReplyIntent::SearchBlog;
                let criteria = args.merge_into(extract_blog_criteria(normalized));
                metadata.criteria_echoed = serde_json::to_value(&criteria).ok();
                let plan = self.builder.build_blog_plan(&criteria);
                let total = system.count(EntityKind::BlogPost);
                match self.store.find_many(&plan).await {
                    Ok(rows) => {
                        metadata.result_counts = Some(ResultCounts {
                            returned: rows.len(),
                            platform_total: total,
                        });
                        composer::render_blog_results(&rows, &criteria, total)
                    }
                    Err(e) => Self::search_failed(&e, metadata),
                }
            }
            Intent::GetHelp(args) => {
                metadata.intent = ReplyIntent::Help;
                composer::help_template(args.topic).to_string()
            }
        }
    }

    fn search_failed(error: &crate::error::StorageError, metadata: &mut ReplyMetadata) -> String {
        tracing::warn!(error = %error, "Search failed");
        metadata.fallback = Some(FallbackReason::StorageFailed);
        metadata.error = Some("search_failed".to_string());
        SEARCH_FAILED.to_string()
    }

    /// RAG path. Without matches the capability summary is returned; with
    /// matches a grounded answer is generated when `generate` is set and the
    /// backend answers, otherwise the best item is returned verbatim.
    async fn answer_from_knowledge(
        &self,
        utterance: &str,
        normalized: &str,
        system: &SystemContext,
        generate: bool,
        metadata: &mut ReplyMetadata,
    ) -> String {
        metadata.intent = ReplyIntent::Knowledge;

        let items = self.knowledge.retrieve_top(normalized, self.retrieval_top_k);
        let Some(top) = items.first() else {
            tracing::info!("No knowledge match, replying with capability summary");
            metadata.fallback = Some(FallbackReason::NoKnowledgeMatch);
            return CAPABILITY_SUMMARY.to_string();
        };
        metadata.knowledge_ids = items.iter().map(|s| s.item.id.clone()).collect();

        if !generate {
            return composer::render_knowledge_verbatim(top);
        }

        let messages = composer::build_rag_messages(utterance, &items, system);
        match self.llm.complete_text(&messages).await {
            Ok(answer) => answer,
            Err(e) => {
                if e.is_unavailable() {
                    tracing::info!("Backend unavailable, answering with top knowledge item");
                } else {
                    tracing::warn!(error = %e, "Grounded answer failed, answering with top knowledge item");
                }
                metadata.fallback = Some(FallbackReason::from(&e));
                composer::render_knowledge_verbatim(top)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, StorageError};
    use crate::llm::testing::scripted_manager;
    use crate::llm::{ChatMessage, ChatResponse, ChatRole, ToolCall};
    use crate::search::QueryPlan;
    use crate::storage::memory_store::fixtures::sample_store;
    use crate::storage::JoinedRow;
    use crate::types::{ConversationTurn, UserRole};
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<Vec<ChatMessage>>>>;

    fn engine_with(llm: LLMManager, store: Arc<dyn MarketplaceStore>) -> ChatEngine {
        ChatEngine::new(
            &AssistantConfig::default(),
            Arc::new(llm),
            store,
            KnowledgeBase::shared_builtin(),
        )
    }

    fn scripted(script: Vec<Result<ChatResponse, BackendError>>) -> (ChatEngine, Calls) {
        let (llm, calls) = scripted_manager(script);
        (engine_with(llm, Arc::new(sample_store())), calls)
    }

    fn offline() -> ChatEngine {
        engine_with(LLMManager::disabled(), Arc::new(sample_store()))
    }

    fn tool(name: &str, arguments: &str) -> Result<ChatResponse, BackendError> {
        Ok(ChatResponse::ToolCalls(vec![ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: arguments.into(),
        }]))
    }

    #[tokio::test]
    async fn test_tutor_search_via_function_call() {
        let (engine, calls) = scripted(vec![tool(
            "search_tutors",
            r#"{"subject":"Toán","city":"Hà Nội","max_price":300000}"#,
        )]);
        let reply = engine
            .chat(ChatRequest::new("tìm gia sư toán ở Hà Nội dưới 300k").with_role(UserRole::Student))
            .await;

        assert!(reply.success);
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchTutors);
        assert_eq!(reply.metadata.function_call.as_ref().unwrap().name, "search_tutors");
        assert_eq!(
            reply.metadata.result_counts,
            Some(ResultCounts {
                returned: 2,
                platform_total: Some(3)
            })
        );
        let echoed = reply.metadata.criteria_echoed.unwrap();
        assert_eq!(echoed["subjects"], serde_json::json!(["Toán"]));
        assert_eq!(echoed["city"], "Hà Nội");
        assert_eq!(echoed["maxPrice"], 300000);
        assert!(reply.response.contains("Nguyễn Minh Anh"));
        assert!(!reply.response.contains("Lê Thu Hà"));
        // one routing call, no generation
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tutor_search_offline() {
        let reply = offline().chat(ChatRequest::new("tim gia su toan o Ha Noi duoi 300k")).await;

        assert!(reply.success);
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchTutors);
        assert_eq!(reply.metadata.fallback, Some(FallbackReason::BackendUnavailable));
        assert!(reply.metadata.function_call.is_none());
        assert_eq!(reply.metadata.result_counts.unwrap().returned, 2);
        assert!(reply.response.contains("Trần Văn Bình"));
    }

    #[tokio::test]
    async fn test_offline_search_picks_courses_and_blog() {
        let reply = offline().chat(ChatRequest::new("tìm khóa học tiếng anh")).await;
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchCourses);
        assert!(reply.response.contains("IELTS cơ bản"));

        let reply = offline().chat(ChatRequest::new("tìm bài viết về học toán")).await;
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchBlog);
        assert!(reply.response.contains("Bí quyết học Toán hiệu quả"));
    }

    #[tokio::test]
    async fn test_offline_search_can_be_disabled() {
        let mut config = AssistantConfig::default();
        config.routing.offline_search_fallback = false;
        let engine = ChatEngine::new(
            &config,
            Arc::new(LLMManager::disabled()),
            Arc::new(sample_store()),
            KnowledgeBase::shared_builtin(),
        );
        let reply = engine.chat(ChatRequest::new("tìm gia sư toán ở Hà Nội")).await;
        assert_eq!(reply.metadata.intent, ReplyIntent::Knowledge);
    }

    #[tokio::test]
    async fn test_no_matches_is_still_success() {
        let (engine, _) = scripted(vec![tool("search_tutors", r#"{"subject":"Piano"}"#)]);
        let reply = engine.chat(ChatRequest::new("gia sư piano")).await;
        assert!(reply.success);
        assert_eq!(reply.metadata.result_counts.unwrap().returned, 0);
        assert!(reply.response.contains("môn Piano"));
    }

    #[tokio::test]
    async fn test_cancellation_help_offline_returns_item_verbatim() {
        let (engine, calls) = scripted(vec![Err(BackendError::Unavailable)]);
        let reply = engine.chat(ChatRequest::new("làm sao hủy lịch")).await;

        let expected = KnowledgeBase::shared_builtin();
        let expected = expected.get("booking-cancel").unwrap();
        assert!(reply.success);
        assert_eq!(reply.metadata.intent, ReplyIntent::Knowledge);
        assert_eq!(reply.metadata.fallback, Some(FallbackReason::BackendUnavailable));
        assert_eq!(reply.metadata.knowledge_ids[0], "booking-cancel");
        assert_eq!(reply.response, expected.content);
        // the router call only; no generation attempted
        assert_eq!(calls.lock().unwrap().len(), 1);

        let reply = offline().chat(ChatRequest::new("làm sao huỷ lịch")).await;
        assert_eq!(reply.response, expected.content);
    }

    #[tokio::test]
    async fn test_no_overlap_returns_capability_summary() {
        let (engine, calls) = scripted(vec![Ok(ChatResponse::Content("Tôi không rõ.".into()))]);
        let reply = engine.chat(ChatRequest::new("xyz qwerty")).await;

        assert!(reply.success);
        assert_eq!(reply.response, CAPABILITY_SUMMARY);
        assert_eq!(reply.metadata.fallback, Some(FallbackReason::NoKnowledgeMatch));
        assert!(reply.metadata.knowledge_ids.is_empty());
        assert_eq!(calls.lock().unwrap().len(), 1);

        let reply = offline().chat(ChatRequest::new("xyz qwerty")).await;
        assert!(reply.success);
        assert_eq!(reply.response, CAPABILITY_SUMMARY);
    }

    #[tokio::test]
    async fn test_grounded_answer_is_generated_when_backend_answers() {
        let (engine, calls) = scripted(vec![
            Ok(ChatResponse::Content(String::new())),
            Ok(ChatResponse::Content("Bạn vào mục Lịch học của tôi để hủy.".into())),
        ]);
        let reply = engine.chat(ChatRequest::new("làm sao hủy lịch")).await;

        assert_eq!(reply.response, "Bạn vào mục Lịch học của tôi để hủy.");
        assert!(reply.metadata.fallback.is_none());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1][1].text().contains("Lịch học của tôi"));
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back_to_top_item() {
        let (engine, _) = scripted(vec![
            Ok(ChatResponse::Content(String::new())),
            Err(BackendError::Timeout(std::time::Duration::from_secs(20))),
        ]);
        let reply = engine.chat(ChatRequest::new("làm sao hủy lịch")).await;

        assert!(reply.success);
        assert_eq!(reply.metadata.fallback, Some(FallbackReason::BackendFailed));
        assert_eq!(reply.metadata.knowledge_ids[0], "booking-cancel");
        assert!(reply.response.contains("Hủy lịch"));
    }

    #[tokio::test]
    async fn test_help_call_uses_fixed_template() {
        let (engine, calls) = scripted(vec![tool("get_help", r#"{"topic":"payment"}"#)]);
        let reply = engine.chat(ChatRequest::new("thanh toán thế nào?")).await;

        assert_eq!(reply.metadata.intent, ReplyIntent::Help);
        assert_eq!(reply.response, composer::help_template(router::HelpTopic::Payment));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_fall_back_to_extracted_criteria() {
        let (engine, _) = scripted(vec![tool("search_tutors", r#"{"min_rating": 42}"#)]);
        let reply = engine.chat(ChatRequest::new("tìm gia sư toán ở Hà Nội")).await;

        assert!(reply.success);
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchTutors);
        assert_eq!(reply.metadata.fallback, Some(FallbackReason::InvalidArguments));
        assert_eq!(reply.metadata.criteria_echoed.unwrap()["city"], "Hà Nội");
        assert_eq!(reply.metadata.result_counts.unwrap().returned, 2);
    }

    #[tokio::test]
    async fn test_course_and_blog_calls() {
        let (engine, _) = scripted(vec![
            tool("search_courses", r#"{"subject":"english"}"#),
            tool("search_blog", r#"{}"#),
        ]);
        let reply = engine.chat(ChatRequest::new("khóa học tiếng anh")).await;
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchCourses);
        assert!(reply.response.contains("IELTS cơ bản"));
        assert!(reply.response.contains("Phạm Quốc Dũng"));

        let reply = engine.chat(ChatRequest::new("bài viết về học toán")).await;
        assert_eq!(reply.metadata.intent, ReplyIntent::SearchBlog);
        assert!(reply.response.contains("Bí quyết học Toán hiệu quả"));
    }

    #[tokio::test]
    async fn test_only_recent_turns_reach_the_backend() {
        let (engine, calls) = scripted(vec![tool("get_help", r#"{"topic":"booking"}"#)]);
        let history: Vec<ConversationTurn> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("lượt {}", i))
                } else {
                    ConversationTurn::assistant(format!("lượt {}", i))
                }
            })
            .collect();
        engine
            .chat(ChatRequest::new("đặt lịch thế nào").with_history(history))
            .await;

        let calls = calls.lock().unwrap();
        let sent = &calls[0];
        assert_eq!(sent[0].role, ChatRole::System);
        // synthetic pair
        assert!(sent[1].text().starts_with("[Bối cảnh hệ thống]"));
        assert_eq!(sent[2].role, ChatRole::Assistant);
        // exactly the six most recent turns, then the utterance
        let turns: Vec<&str> = sent[3..sent.len() - 1].iter().map(|m| m.text()).collect();
        assert_eq!(turns, vec!["lượt 4", "lượt 5", "lượt 6", "lượt 7", "lượt 8", "lượt 9"]);
        assert_eq!(sent.last().unwrap().text(), "đặt lịch thế nào");
    }

    struct FailingStore;

    #[async_trait]
    impl MarketplaceStore for FailingStore {
        async fn count_by_kind(&self, _kind: EntityKind) -> Result<u64, StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        async fn find_many(&self, _plan: &QueryPlan) -> Result<Vec<JoinedRow>, StorageError> {
            Err(StorageError::Query("relation \"profiles\" does not exist".into()))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_uses_generic_template() {
        let engine = engine_with(LLMManager::disabled(), Arc::new(FailingStore));
        let reply = engine.chat(ChatRequest::new("tìm gia sư toán")).await;

        assert!(reply.success);
        assert_eq!(reply.response, SEARCH_FAILED);
        assert_eq!(reply.metadata.fallback, Some(FallbackReason::StorageFailed));
        assert!(!reply.response.contains("profiles"));
    }

    struct PanickingStore;

    #[async_trait]
    impl MarketplaceStore for PanickingStore {
        async fn count_by_kind(&self, _kind: EntityKind) -> Result<u64, StorageError> {
            panic!("driver bug");
        }

        async fn find_many(&self, _plan: &QueryPlan) -> Result<Vec<JoinedRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_unexpected_fault_is_caught_at_the_boundary() {
        let engine = engine_with(LLMManager::disabled(), Arc::new(PanickingStore));
        let reply = engine.chat(ChatRequest::new("xin chào")).await;

        assert!(!reply.success);
        assert_eq!(reply.response, APOLOGY);
        assert_eq!(reply.metadata.error.as_deref(), Some("internal_error"));
    }

    #[tokio::test]
    async fn test_blank_utterance() {
        let (engine, calls) = scripted(vec![]);
        let reply = engine.chat(ChatRequest::new("   ")).await;
        assert!(reply.success);
        assert_eq!(reply.response, CAPABILITY_SUMMARY);
        assert!(calls.lock().unwrap().is_empty());
    }
}
