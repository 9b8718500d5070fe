// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! Assembles the complete pipeline and dialogue stack over an in-memory
//! SQLite database with mock search, LLM, and embedding adapters.

use std::sync::Arc;
use std::time::Duration;

use tidings_cards::CardSynthesizer;
use tidings_config::model::{DialogueConfig, MemoryConfig, PipelineConfig};
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, CompletionAdapter, EmbeddingAdapter, SearchAdapter};
use tidings_core::types::{PipelineRequest, PipelineRun};
use tidings_dialogue::{ChatRequest, ChatResponse, DialogueManager};
use tidings_index::{EmbeddingIndexer, VectorIndex};
use tidings_memory::UserMemoryStore;
use tidings_pipeline::Orchestrator;
use tidings_retrieval::RetrievalEngine;
use tidings_sentiment::SentimentScorer;
use tidings_store::DocumentStore;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;
use crate::mock_search::MockSearch;

/// Builder for test environments with configurable mock behavior.
pub struct TestHarnessBuilder {
    search_results: usize,
    search_delay: Option<Duration>,
    search_fails: bool,
    llm_responses: Vec<String>,
    llm_fails: bool,
    embedder_fails: bool,
    pipeline_deadline_secs: u64,
    history_cap: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            search_results: 10,
            search_delay: None,
            search_fails: false,
            llm_responses: Vec::new(),
            llm_fails: false,
            embedder_fails: false,
            pipeline_deadline_secs: 300,
            history_cap: 30,
        }
    }

    /// Number of distinct articles the mock search returns per call.
    pub fn with_search_results(mut self, n: usize) -> Self {
        self.search_results = n;
        self
    }

    /// Delay before the mock search answers (deadline tests).
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// Make every search call fail.
    pub fn with_failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    /// Pre-load mock LLM responses (FIFO).
    pub fn with_llm_responses(mut self, responses: Vec<String>) -> Self {
        self.llm_responses = responses;
        self
    }

    /// Make every LLM call fail.
    pub fn with_failing_llm(mut self) -> Self {
        self.llm_fails = true;
        self
    }

    /// Make every embedding call fail (index-outage scenarios).
    pub fn with_failing_embedder(mut self) -> Self {
        self.embedder_fails = true;
        self
    }

    /// Override the pipeline deadline.
    pub fn with_pipeline_deadline(mut self, secs: u64) -> Self {
        self.pipeline_deadline_secs = secs;
        self
    }

    /// Override the dialogue history cap.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Assembles the full stack.
    pub async fn build(self) -> Result<TestHarness, TidingsError> {
        let store = DocumentStore::open_in_memory().await?;
        let index = VectorIndex::new(store.database().connection().clone());

        let search: Arc<MockSearch> = Arc::new(if self.search_fails {
            MockSearch::failing()
        } else {
            let mut search = MockSearch::returning(self.search_results);
            if let Some(delay) = self.search_delay {
                search = search.with_delay(delay);
            }
            search
        });
        let llm: Arc<MockProvider> = Arc::new(if self.llm_fails {
            MockProvider::failing()
        } else {
            MockProvider::with_responses(self.llm_responses)
        });
        let embedder: Arc<MockEmbedder> = Arc::new(if self.embedder_fails {
            MockEmbedder::failing()
        } else {
            MockEmbedder::new()
        });

        let memory = Arc::new(UserMemoryStore::new(
            store.clone(),
            embedder.clone() as Arc<dyn EmbeddingAdapter>,
            MemoryConfig::default(),
        ));
        let indexer = Arc::new(EmbeddingIndexer::new(
            index.clone(),
            embedder.clone() as Arc<dyn EmbeddingAdapter>,
            32,
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            search.clone() as Arc<dyn SearchAdapter>,
            store.clone(),
            indexer,
            llm.clone() as Arc<dyn CompletionAdapter>,
            SentimentScorer::new(),
            CardSynthesizer::new(llm.clone() as Arc<dyn CompletionAdapter>),
            memory.clone(),
            PipelineConfig {
                deadline_secs: self.pipeline_deadline_secs,
                run_ttl_days: 7,
            },
        ));
        let retrieval = Arc::new(RetrievalEngine::new(
            index,
            store.clone(),
            embedder.clone() as Arc<dyn EmbeddingAdapter>,
            0.2,
        ));
        let dialogue = Arc::new(DialogueManager::new(
            store.clone(),
            retrieval,
            llm.clone() as Arc<dyn CompletionAdapter>,
            memory.clone(),
            DialogueConfig {
                history_cap: self.history_cap,
                ..DialogueConfig::default()
            },
        ));

        let adapters: Vec<Arc<dyn Adapter>> = vec![
            search as Arc<dyn Adapter>,
            llm.clone() as Arc<dyn Adapter>,
            embedder as Arc<dyn Adapter>,
            Arc::new(store.clone()) as Arc<dyn Adapter>,
        ];

        Ok(TestHarness {
            store,
            memory,
            orchestrator,
            dialogue,
            llm,
            adapters,
        })
    }
}

/// A complete in-memory Tidings stack with mock providers.
pub struct TestHarness {
    pub store: DocumentStore,
    pub memory: Arc<UserMemoryStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub dialogue: Arc<DialogueManager>,
    pub llm: Arc<MockProvider>,
    pub adapters: Vec<Arc<dyn Adapter>>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs the pipeline end to end.
    pub async fn run_pipeline(
        &self,
        request: PipelineRequest,
    ) -> Result<PipelineRun, TidingsError> {
        self.orchestrator.run(request).await
    }

    /// Processes one dialogue turn.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TidingsError> {
        self.dialogue.chat(request).await
    }

    /// A chat request with the harness defaults.
    pub fn chat_request(
        user_id: &str,
        session_id: Option<String>,
        message: &str,
    ) -> ChatRequest {
        ChatRequest {
            user_id: user_id.to_string(),
            session_id,
            message: message.to_string(),
            run_id: None,
            max_context_news: 5,
            use_memory: true,
            personalize: true,
            wait: false,
        }
    }
}
