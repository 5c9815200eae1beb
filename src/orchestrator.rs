//! Pipeline orchestrator for Transmeet.
//!
//! Coordinates one question from routing to the final answer event.

use crate::catalog::KnowledgeBaseCatalog;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TransmeetError};
use crate::events::{AnswerEvent, EventEmitter, EventSink};
use crate::generation::{ChatProvider, OpenAIChatProvider};
use crate::rag::{
    format_context, AnswerGenerator, ContextRetriever, GenerationOutcome, Question, QueryRouter,
    RetrievalLimits, RoutingDecision,
};
use crate::vector_store::{QdrantStore, VectorSearch};
use std::sync::Arc;
use tracing::{info, instrument};

/// External services the pipeline talks to.
pub struct Components {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorSearch>,
    pub router: Arc<dyn ChatProvider>,
    pub primary: Arc<dyn ChatProvider>,
    pub fallback: Arc<dyn ChatProvider>,
}

impl Components {
    /// Build production clients from settings. Fails on missing credentials.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            embedder: Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?),
            store: Arc::new(QdrantStore::from_settings(&settings.vector_store)?),
            router: Arc::new(OpenAIChatProvider::from_settings(
                "router",
                &settings.routing.as_provider(),
            )?),
            primary: Arc::new(OpenAIChatProvider::from_settings(
                "primary",
                &settings.providers.primary,
            )?),
            fallback: Arc::new(OpenAIChatProvider::from_settings(
                "fallback",
                &settings.providers.fallback,
            )?),
        })
    }
}

/// The question-answering pipeline. Built once, shared across requests.
pub struct Orchestrator {
    catalog: Arc<KnowledgeBaseCatalog>,
    router: QueryRouter,
    retriever: ContextRetriever,
    generator: AnswerGenerator,
}

impl Orchestrator {
    /// Create an orchestrator with production clients, the configured prompts
    /// and the catalog file (an unreadable catalog degrades to empty).
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let catalog = KnowledgeBaseCatalog::load_or_empty(&settings.catalog_path());
        let components = Components::from_settings(settings)?;

        Ok(Self::with_components(settings, catalog, prompts, components))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        catalog: KnowledgeBaseCatalog,
        prompts: Prompts,
        components: Components,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let prompts = Arc::new(prompts);
        let meetings = settings.vector_store.meetings_collection.clone();

        let router = QueryRouter::new(components.router, prompts.clone(), meetings.clone());
        let retriever = ContextRetriever::new(
            components.embedder,
            components.store,
            catalog.clone(),
            meetings,
        )
        .with_limits(RetrievalLimits::from(&settings.vector_store));
        let generator = AnswerGenerator::new(components.primary, components.fallback, prompts)
            .with_temperatures(
                settings.providers.primary.temperature,
                settings.providers.fallback.temperature,
            );

        Self {
            catalog,
            router,
            retriever,
            generator,
        }
    }

    pub fn catalog(&self) -> &KnowledgeBaseCatalog {
        &self.catalog
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    /// Answer a question, emitting progress and exactly one terminal event.
    ///
    /// Errors are returned only for unrecoverable failures (embedding, both
    /// providers, or a broken event sink); a terminal `Error` event has been
    /// emitted for the first two.
    #[instrument(skip_all, fields(question = %question.text))]
    pub async fn ask<S: EventSink>(
        &self,
        question: &Question,
        emitter: &mut EventEmitter<S>,
    ) -> Result<GenerationOutcome> {
        if question.history.is_some() {
            emitter.emit(AnswerEvent::info("Conversation history received")).await?;
        }
        if let Some(problem) = self.catalog.load_warning() {
            emitter.emit(AnswerEvent::warning(problem)).await?;
        }
        if self.catalog.is_empty() {
            emitter
                .emit(AnswerEvent::info("No repositories configured in the catalog"))
                .await?;
        }

        emitter
            .emit(AnswerEvent::info("Routing question to the appropriate knowledge base..."))
            .await?;
        let decision = self.router.route(question, &self.catalog).await;
        let routed = match &decision {
            RoutingDecision::Specific(collection) => {
                format!("Router selected collection '{}'", collection)
            }
            RoutingDecision::General => {
                "No specific knowledge base selected; running deep search".to_string()
            }
        };
        emitter.emit(AnswerEvent::info(routed)).await?;

        let result = match self.retriever.retrieve(&decision, question, emitter).await {
            Ok(result) => result,
            Err(e @ TransmeetError::Emit(_)) => return Err(e),
            Err(e) => {
                emitter.emit(AnswerEvent::error(e.to_string())).await?;
                return Err(e);
            }
        };
        info!("Retrieved {} context records", result.len());
        emitter
            .emit(AnswerEvent::info(format!("Found {} relevant context records", result.len())))
            .await?;

        let context = format_context(&result);
        self.generator.generate(question, &context, emitter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RepositoryConfig;
    use crate::rag::NO_CONTEXT_SENTINEL;
    use crate::testing::{FixedEmbedder, RecordingStore, ScriptedProvider};
    use crate::vector_store::{MemoryVectorStore, Provenance};

    struct Harness {
        orchestrator: Orchestrator,
        router: Arc<ScriptedProvider>,
        primary: Arc<ScriptedProvider>,
        fallback: Arc<ScriptedProvider>,
        store: Arc<RecordingStore>,
    }

    fn alpha_catalog() -> KnowledgeBaseCatalog {
        KnowledgeBaseCatalog::new(vec![RepositoryConfig {
            name: "Alpha".to_string(),
            repo: "acme/alpha".to_string(),
            collection_name: "kb_alpha".to_string(),
        }])
    }

    fn harness(
        catalog: KnowledgeBaseCatalog,
        memory: MemoryVectorStore,
        embedder: FixedEmbedder,
        router: ScriptedProvider,
        primary: ScriptedProvider,
        fallback: ScriptedProvider,
    ) -> Harness {
        let settings = Settings::default();
        let router = Arc::new(router);
        let primary = Arc::new(primary);
        let fallback = Arc::new(fallback);
        let store = Arc::new(RecordingStore::new(Arc::new(memory)));

        let orchestrator = Orchestrator::with_components(
            &settings,
            catalog,
            Prompts::default(),
            Components {
                embedder: Arc::new(embedder),
                store: store.clone(),
                router: router.clone(),
                primary: primary.clone(),
                fallback: fallback.clone(),
            },
        );

        Harness {
            orchestrator,
            router,
            primary,
            fallback,
            store,
        }
    }

    fn code(path: &str) -> Provenance {
        Provenance::Code {
            file_path: path.to_string(),
            snippet: "// code".to_string(),
        }
    }

    fn terminal_kinds(events: &[AnswerEvent]) -> Vec<&'static str> {
        events.iter().filter(|e| e.is_terminal()).map(|e| e.kind()).collect()
    }

    #[tokio::test]
    async fn test_general_question_with_empty_catalog() {
        let memory = MemoryVectorStore::new();
        memory.create_collection("transmeet_meetings_local").unwrap();
        let h = harness(
            KnowledgeBaseCatalog::empty(),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router"),
            ScriptedProvider::new("primary").stream_ok(&["Paris", "."]),
            ScriptedProvider::new("fallback"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        let outcome = h
            .orchestrator
            .ask(&Question::new("What is the capital of France?"), &mut emitter)
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Streamed { chunks: 2 });
        assert!(h.router.requests().is_empty());
        assert_eq!(
            h.store.searched(),
            vec![("transmeet_meetings_local".to_string(), 5)]
        );
        assert!(h.primary.requests()[0].user.contains(NO_CONTEXT_SENTINEL));
        assert_eq!(terminal_kinds(&emitter.into_sink()), vec!["STREAM_END"]);
    }

    #[tokio::test]
    async fn test_unreadable_catalog_is_reported_before_answering() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryVectorStore::new();
        memory.create_collection("transmeet_meetings_local").unwrap();
        let h = harness(
            KnowledgeBaseCatalog::load_or_empty(&dir.path().join("repos.json")),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router"),
            ScriptedProvider::new("primary").stream_ok(&["ok"]),
            ScriptedProvider::new("fallback"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        h.orchestrator
            .ask(&Question::new("q"), &mut emitter)
            .await
            .unwrap();

        let events = emitter.into_sink();
        let warning = events.iter().find(|e| e.kind() == "WARNING").unwrap();
        assert!(warning.payload().contains("Cannot read catalog"));
        assert!(warning.payload().contains("repos.json"));
        assert_eq!(terminal_kinds(&events), vec!["STREAM_END"]);
    }

    #[tokio::test]
    async fn test_ask_runs_on_a_spawned_task() {
        let memory = MemoryVectorStore::new();
        memory.insert("kb_alpha", vec![1.0, 0.0], code("a.rs")).unwrap();
        memory.create_collection("transmeet_meetings_local").unwrap();
        let h = harness(
            alpha_catalog(),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router").complete_ok("general"),
            ScriptedProvider::new("primary").stream_ok(&["spawned"]),
            ScriptedProvider::new("fallback"),
        );
        let orchestrator = Arc::new(h.orchestrator);

        let task = tokio::spawn(async move {
            let mut emitter = EventEmitter::new(Vec::new());
            let outcome = orchestrator.ask(&Question::new("q"), &mut emitter).await;
            (outcome, emitter.into_sink())
        });
        let (outcome, events) = task.await.unwrap();

        assert_eq!(outcome.unwrap(), GenerationOutcome::Streamed { chunks: 1 });
        assert_eq!(h.store.searched().len(), 2);
        assert_eq!(terminal_kinds(&events), vec!["STREAM_END"]);
    }

    #[tokio::test]
    async fn test_routed_question_uses_targeted_context() {
        let memory = MemoryVectorStore::new();
        memory.insert("kb_alpha", vec![0.6, 0.8], code("mid.rs")).unwrap();
        memory.insert("kb_alpha", vec![1.0, 0.0], code("best.rs")).unwrap();
        memory.insert("kb_alpha", vec![0.0, 1.0], code("worst.rs")).unwrap();
        let h = harness(
            alpha_catalog(),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router").complete_ok("kb_alpha"),
            ScriptedProvider::new("primary").stream_ok(&["ok"]),
            ScriptedProvider::new("fallback"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        h.orchestrator
            .ask(&Question::new("How does Alpha authenticate users?"), &mut emitter)
            .await
            .unwrap();

        assert_eq!(h.store.searched(), vec![("kb_alpha".to_string(), 7)]);
        let prompt = &h.primary.requests()[0].user;
        assert_eq!(prompt.matches("--- context from code").count(), 3);
        let best = prompt.find("best.rs").unwrap();
        let mid = prompt.find("mid.rs").unwrap();
        let worst = prompt.find("worst.rs").unwrap();
        assert!(best < mid && mid < worst);
    }

    #[tokio::test]
    async fn test_missing_routed_collection_still_answers() {
        let h = harness(
            alpha_catalog(),
            MemoryVectorStore::new(),
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router").complete_ok("kb_alpha"),
            ScriptedProvider::new("primary").stream_ok(&["answer"]),
            ScriptedProvider::new("fallback"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        h.orchestrator
            .ask(&Question::new("Alpha question"), &mut emitter)
            .await
            .unwrap();

        let events = emitter.into_sink();
        assert!(events.iter().any(|e| e.kind() == "WARNING"));
        assert!(h.primary.requests()[0].user.contains(NO_CONTEXT_SENTINEL));
        assert_eq!(events.last(), Some(&AnswerEvent::StreamEnd));
        assert_eq!(terminal_kinds(&events), vec!["STREAM_END"]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_with_fallback_answer() {
        let memory = MemoryVectorStore::new();
        memory.create_collection("kb_alpha").unwrap();
        let h = harness(
            alpha_catalog(),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router").complete_ok("kb_alpha"),
            ScriptedProvider::new("primary").stream_then_fail(&["par", "tial"], "stream reset"),
            ScriptedProvider::new("fallback").complete_ok("The complete fallback answer."),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        let outcome = h
            .orchestrator
            .ask(&Question::new("q"), &mut emitter)
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Fallback);
        let events = emitter.into_sink();
        let final_idx = events
            .iter()
            .position(|e| matches!(e, AnswerEvent::FinalAnswer(_)))
            .unwrap();
        assert_eq!(
            events[final_idx],
            AnswerEvent::FinalAnswer("The complete fallback answer.".into())
        );
        assert_eq!(events.iter().filter(|e| e.kind() == "ANSWER_CHUNK").count(), 2);
        let warning_idx = events.iter().rposition(|e| e.kind() == "WARNING").unwrap();
        assert!(events[warning_idx..].iter().all(|e| e.kind() != "ANSWER_CHUNK"));
        assert_eq!(terminal_kinds(&events), vec!["FINAL_ANSWER"]);
        assert_eq!(h.fallback.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_both_providers_failing_is_terminal_error() {
        let memory = MemoryVectorStore::new();
        memory.create_collection("transmeet_meetings_local").unwrap();
        let h = harness(
            KnowledgeBaseCatalog::empty(),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router"),
            ScriptedProvider::new("primary").stream_refused("503"),
            ScriptedProvider::new("fallback").complete_err("quota exceeded"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        let err = h
            .orchestrator
            .ask(&Question::new("q"), &mut emitter)
            .await
            .unwrap_err();

        assert!(matches!(err, TransmeetError::Provider(_)));
        let events = emitter.into_sink();
        assert_eq!(terminal_kinds(&events), vec!["ERROR"]);
        assert_eq!(events.last().map(|e| e.kind()), Some("ERROR"));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_terminal_error_before_generation() {
        let h = harness(
            alpha_catalog(),
            MemoryVectorStore::new(),
            FixedEmbedder::failing(),
            ScriptedProvider::new("router").complete_ok("general"),
            ScriptedProvider::new("primary"),
            ScriptedProvider::new("fallback"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        let err = h
            .orchestrator
            .ask(&Question::new("q"), &mut emitter)
            .await
            .unwrap_err();

        assert!(matches!(err, TransmeetError::Embedding(_)));
        assert!(h.primary.requests().is_empty());
        assert_eq!(terminal_kinds(&emitter.into_sink()), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn test_routing_failure_degrades_silently_to_deep_search() {
        let memory = MemoryVectorStore::new();
        memory.insert("kb_alpha", vec![1.0, 0.0], code("a.rs")).unwrap();
        memory.create_collection("transmeet_meetings_local").unwrap();
        let h = harness(
            alpha_catalog(),
            memory,
            FixedEmbedder::new(vec![1.0, 0.0]),
            ScriptedProvider::new("router").complete_err("timeout"),
            ScriptedProvider::new("primary").stream_ok(&["x"]),
            ScriptedProvider::new("fallback"),
        );

        let mut emitter = EventEmitter::new(Vec::new());
        h.orchestrator
            .ask(&Question::new("q"), &mut emitter)
            .await
            .unwrap();

        let events = emitter.into_sink();
        assert!(events.iter().all(|e| e.kind() != "WARNING" && e.kind() != "ERROR"));
        assert_eq!(h.store.searched().len(), 2);
    }
}
