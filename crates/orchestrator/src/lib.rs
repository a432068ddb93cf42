//! The per-request orchestration pipeline.
//!
//! One `Orchestrator` serves many concurrent requests. For each request it
//! fans out to the optional context sources under independent timeouts,
//! merges whatever resolved into a best-effort `PromptContext`, renders the
//! bounded prompt, invokes the model backend once, and assembles the
//! wire-facing chat payload — including partial-failure metadata.
//!
//! Failure policy: a source that fails or times out narrows the context
//! silently (its fallback value is used). Only two things fail a request:
//! a missing user question, and a failed completion call. A failed memory
//! write after a successful completion is logged and absorbed, since the
//! response was already computed.

pub mod prompt;

use futures::FutureExt;
use nearbot_config::AppConfig;
use nearbot_context::{FavoritesStore, MemoryStore, render_history};
use nearbot_core::chat::{ChatMessage, ChatResponse, Role, SourceRef};
use nearbot_core::completion::{CompletionBackend, CompletionRequest};
use nearbot_core::context::{MemoryEntry, PromptContext};
use nearbot_core::error::Error;
use nearbot_core::location::{GeoLookup, Location};
use nearbot_core::search::{SearchResult, WebSearch};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use prompt::PromptBuilder;

/// The canned content returned when the model backend fails. The diagnostic
/// reason rides separately in the response `error` field.
pub const APOLOGY: &str =
    "Sorry, I couldn't reach the language model to answer your question. \
     Please try again in a moment.";

/// Content for the degraded choice when the request carried no question.
const NO_QUESTION_CONTENT: &str = "I didn't receive a question to answer.";

/// One inbound question with its context flags, as extracted by the
/// gateway (or the CLI).
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub messages: Vec<ChatMessage>,
    pub include_sources: bool,
    pub max_sources: Option<usize>,
    pub client_addr: IpAddr,
}

/// Request lifecycle stages, for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ResolvingContext,
    BuildingPrompt,
    AwaitingCompletion,
    Done,
    Failed,
}

pub struct Orchestrator {
    geo: Arc<dyn GeoLookup>,
    web: Arc<dyn WebSearch>,
    backend: Arc<dyn CompletionBackend>,
    favorites: Arc<FavoritesStore>,
    memory: Arc<MemoryStore>,
    prompt: PromptBuilder,
    model: String,
    temperature: f32,
    max_tokens: u32,
    location_timeout: Duration,
    search_timeout: Duration,
    memory_limit: usize,
    default_max_sources: usize,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        geo: Arc<dyn GeoLookup>,
        web: Arc<dyn WebSearch>,
        backend: Arc<dyn CompletionBackend>,
        favorites: Arc<FavoritesStore>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self {
            geo,
            web,
            backend,
            favorites,
            memory,
            prompt: PromptBuilder::new(config.prompt.max_chars),
            model: config.model.model.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            location_timeout: Duration::from_secs(config.location.timeout_secs),
            search_timeout: Duration::from_secs(config.search.timeout_secs),
            memory_limit: config.prompt.memory_limit,
            default_max_sources: config.search.max_results,
        }
    }

    /// Run one request through the pipeline. Always produces a response
    /// body; failures ride in its `error` field rather than propagating.
    pub async fn handle(&self, request: AskRequest) -> ChatResponse {
        // The most recent user-authored message is the question.
        let Some(question) = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
        else {
            debug!(stage = ?Stage::Failed, "Request carried no user message");
            return ChatResponse::degraded(
                &self.model,
                NO_QUESTION_CONTENT,
                Error::NoUserQuery.to_string(),
            );
        };

        debug!(stage = ?Stage::ResolvingContext, include_sources = request.include_sources);
        let (context, search_results) = self.resolve_context(&question, &request).await;

        debug!(stage = ?Stage::BuildingPrompt);
        let rendered = self.prompt.build(&context);

        debug!(stage = ?Stage::AwaitingCompletion, prompt_chars = rendered.len());
        let completion = self
            .backend
            .complete(CompletionRequest {
                prompt: rendered,
                temperature: self.temperature,
                max_tokens: Some(self.max_tokens),
            })
            .await;

        let reply = match completion {
            Ok(reply) => reply,
            Err(e) => {
                // A failed completion is never remembered: only answered
                // turns are written to memory.
                warn!(stage = ?Stage::Failed, error = %e, "Completion failed");
                return ChatResponse::degraded(&self.model, APOLOGY, e.to_string());
            }
        };

        // Persist the exchange before returning so the very next request
        // sees it (read-your-writes in single-instance deployments). A
        // failed write must not fail the request — the answer exists.
        let entry = MemoryEntry::new(&question, &reply.content, context.location.display_name());
        if let Err(e) = self.memory.append(entry).await {
            warn!(error = %e, "Failed to persist memory entry");
        }

        info!(stage = ?Stage::Done, model = %reply.model, "Request completed");
        let response = ChatResponse::answered(&reply.model, &reply.content);
        if request.include_sources && !search_results.is_empty() {
            response.with_sources(mirror_sources(&search_results))
        } else {
            response
        }
    }

    /// Fan out to the context sources concurrently and merge whatever
    /// settles. This stage cannot fail: every branch has a fallback.
    ///
    /// The search branch is scoped by the resolved location, so it awaits a
    /// shared handle on the location future rather than a second lookup;
    /// its own timeout covers only the search call itself.
    async fn resolve_context(
        &self,
        question: &str,
        request: &AskRequest,
    ) -> (PromptContext, Vec<SearchResult>) {
        let location_fut = {
            let geo = self.geo.clone();
            let addr = request.client_addr;
            let timeout = self.location_timeout;
            async move {
                match tokio::time::timeout(timeout, geo.resolve(addr)).await {
                    Ok(location) => location,
                    Err(_) => {
                        warn!("Location lookup timed out, using default");
                        Location::default_fallback()
                    }
                }
            }
            .shared()
        };

        let search_fut = {
            let location_fut = location_fut.clone();
            async move {
                if !request.include_sources {
                    return Vec::new();
                }
                let max = request.max_sources.unwrap_or(self.default_max_sources);
                let location = location_fut.await;
                match tokio::time::timeout(
                    self.search_timeout,
                    self.web.search(question, &location, max),
                )
                .await
                {
                    Ok(results) => results,
                    Err(_) => {
                        warn!("Search timed out, continuing without results");
                        Vec::new()
                    }
                }
            }
        };

        let (location, search_results, favorites, memory_entries) = tokio::join!(
            location_fut,
            search_fut,
            self.favorites.list(),
            self.memory.recent(self.memory_limit),
        );

        let context = PromptContext {
            location,
            favorites,
            search: search_results.clone(),
            memory: render_history(&memory_entries),
            question: question.to_string(),
        };
        (context, search_results)
    }
}

fn mirror_sources(results: &[SearchResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|r| SourceRef {
            title: r.title.clone(),
            url: r.url.clone(),
            snippet: r.description.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nearbot_core::completion::CompletionReply;
    use nearbot_core::error::CompletionError;
    use nearbot_core::search::SearchKind;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedGeo(Location);

    #[async_trait]
    impl GeoLookup for FixedGeo {
        async fn resolve(&self, _addr: IpAddr) -> Location {
            self.0.clone()
        }
    }

    struct FixedSearch {
        results: Vec<SearchResult>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(
            &self,
            _query: &str,
            _location: &Location,
            max_results: usize,
        ) -> Vec<SearchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.clone();
            results.truncate(max_results);
            results
        }
    }

    struct FakeBackend {
        reply: Result<String, CompletionError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl FakeBackend {
        fn answering(text: &str) -> Self {
            Self {
                reply: Ok(text.into()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        fn failing(error: CompletionError) -> Self {
            Self {
                reply: Err(error),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionReply, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt);
            self.reply.clone().map(|content| CompletionReply {
                content,
                model: "fake-model".into(),
            })
        }
    }

    fn web_result(n: usize) -> SearchResult {
        SearchResult {
            title: format!("Result {n}"),
            description: format!("snippet {n}"),
            url: format!("https://example.com/{n}"),
            age: None,
            kind: SearchKind::Web,
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        backend: Arc<FakeBackend>,
        search: Arc<FixedSearch>,
        memory: Arc<MemoryStore>,
        _dir: TempDir,
    }

    fn fixture(backend: FakeBackend, results: Vec<SearchResult>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default();
        let backend = Arc::new(backend);
        let search = Arc::new(FixedSearch {
            results,
            calls: AtomicUsize::new(0),
        });
        let memory = Arc::new(MemoryStore::new(dir.path().join("memory.json"), 10));
        let favorites = Arc::new(FavoritesStore::new(dir.path().join("favorites.json")));

        let orchestrator = Orchestrator::new(
            &config,
            Arc::new(FixedGeo(Location::default_fallback())),
            search.clone(),
            backend.clone(),
            favorites,
            memory.clone(),
        );
        Fixture {
            orchestrator,
            backend,
            search,
            memory,
            _dir: dir,
        }
    }

    fn ask(content: &str, include_sources: bool) -> AskRequest {
        AskRequest {
            messages: vec![ChatMessage::user(content)],
            include_sources,
            max_sources: None,
            client_addr: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn healthy_request_completes_with_stop() {
        let f = fixture(FakeBackend::answering("Try the bakery on rue Cler."), vec![]);
        let response = f.orchestrator.handle(ask("best bakery nearby", false)).await;

        assert!(response.error.is_none());
        assert_eq!(response.choices[0].finish_reason, "stop");
        assert!(!response.choices[0].message.content.is_empty());
    }

    #[tokio::test]
    async fn requested_sources_are_mirrored() {
        let f = fixture(
            FakeBackend::answering("answer"),
            vec![web_result(1), web_result(2), web_result(3)],
        );
        let response = f.orchestrator.handle(ask("bakeries?", true)).await;

        let sources = response.sources.expect("sources should be present");
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].title, "Result 1");
        assert_eq!(sources[0].snippet, "snippet 1");
    }

    #[tokio::test]
    async fn sources_omitted_when_not_requested() {
        let f = fixture(FakeBackend::answering("answer"), vec![web_result(1)]);
        let response = f.orchestrator.handle(ask("bakeries?", false)).await;

        assert!(response.sources.is_none());
        assert_eq!(f.search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_question_skips_the_backend() {
        let f = fixture(FakeBackend::answering("never"), vec![]);
        let response = f
            .orchestrator
            .handle(AskRequest {
                messages: vec![],
                include_sources: false,
                max_sources: None,
                client_addr: "127.0.0.1".parse().unwrap(),
            })
            .await;

        assert_eq!(response.error.as_deref(), Some("no user message in request"));
        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.memory.count().await, 0);
    }

    #[tokio::test]
    async fn assistant_only_messages_count_as_no_question() {
        let f = fixture(FakeBackend::answering("never"), vec![]);
        let response = f
            .orchestrator
            .handle(AskRequest {
                messages: vec![ChatMessage::assistant("hello!")],
                include_sources: false,
                max_sources: None,
                client_addr: "127.0.0.1".parse().unwrap(),
            })
            .await;

        assert!(response.error.is_some());
        assert_eq!(f.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_yields_apology_and_persists_nothing() {
        let f = fixture(FakeBackend::failing(CompletionError::Timeout), vec![]);
        let response = f.orchestrator.handle(ask("anything", false)).await;

        assert_eq!(response.choices[0].message.content, APOLOGY);
        assert_eq!(response.choices[0].finish_reason, "error");
        assert_eq!(response.error.as_deref(), Some("model backend timed out"));
        assert_eq!(f.memory.count().await, 0);
    }

    #[tokio::test]
    async fn empty_search_degrades_to_no_results_marker() {
        let f = fixture(FakeBackend::answering("answer"), vec![]);
        let response = f.orchestrator.handle(ask("bakeries?", true)).await;

        assert!(response.error.is_none());
        assert!(response.sources.is_none());
        let prompt = f.backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains(prompt::NO_RESULTS));
    }

    #[tokio::test]
    async fn latest_user_message_is_the_question() {
        let f = fixture(FakeBackend::answering("answer"), vec![]);
        f.orchestrator
            .handle(AskRequest {
                messages: vec![
                    ChatMessage::user("first question"),
                    ChatMessage::assistant("first answer"),
                    ChatMessage::user("second question"),
                ],
                include_sources: false,
                max_sources: None,
                client_addr: "127.0.0.1".parse().unwrap(),
            })
            .await;

        let prompt = f.backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("My question: \"second question\""));
        assert!(!prompt.contains("My question: \"first question\""));
    }

    #[tokio::test]
    async fn successful_turn_is_readable_by_the_next_request() {
        let f = fixture(FakeBackend::answering("the answer"), vec![]);
        f.orchestrator.handle(ask("remember me", false)).await;
        f.orchestrator.handle(ask("what did I ask?", false)).await;

        let prompt = f.backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Q: remember me -> R: the answer"));
    }

    #[tokio::test]
    async fn max_sources_caps_the_mirror() {
        let f = fixture(
            FakeBackend::answering("answer"),
            vec![web_result(1), web_result(2), web_result(3)],
        );
        let response = f
            .orchestrator
            .handle(AskRequest {
                messages: vec![ChatMessage::user("bakeries?")],
                include_sources: true,
                max_sources: Some(2),
                client_addr: "127.0.0.1".parse().unwrap(),
            })
            .await;

        assert_eq!(response.sources.unwrap().len(), 2);
    }
}
