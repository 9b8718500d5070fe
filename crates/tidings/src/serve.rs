// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidings serve` command implementation.
//!
//! The explicit composition root: every component is constructed once
//! here and handed to the orchestrator, dialogue manager, and gateway.
//! No global mutable state, no registry indirection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tidings_cards::CardSynthesizer;
use tidings_config::{TidingsConfig, load_config, load_config_from_path, validate_config};
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, CompletionAdapter, EmbeddingAdapter, SearchAdapter};
use tidings_dialogue::DialogueManager;
use tidings_gateway::{AppState, start_server};
use tidings_index::{EmbeddingIndexer, VectorIndex};
use tidings_llm::{AnthropicClient, EmbeddingClient, LimitedCompletion, LimitedEmbedding};
use tidings_memory::UserMemoryStore;
use tidings_pipeline::Orchestrator;
use tidings_retrieval::RetrievalEngine;
use tidings_search::SerpSearch;
use tidings_sentiment::SentimentScorer;
use tidings_store::DocumentStore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Loads and semantically validates the configuration.
fn load_validated(config_path: Option<PathBuf>) -> Result<TidingsConfig, Vec<String>> {
    let config = match config_path {
        Some(path) => load_config_from_path(&path),
        None => load_config(),
    }
    .map_err(|e| vec![e.to_string()])?;

    validate_config(&config)
        .map_err(|errors| errors.into_iter().map(|e| e.to_string()).collect::<Vec<_>>())?;
    Ok(config)
}

/// `tidings config-check`: load, validate, report.
pub fn check_config(config_path: Option<PathBuf>) -> Result<(), Vec<String>> {
    load_validated(config_path).map(|_| ())
}

/// Runs the `tidings serve` command until SIGINT/SIGTERM.
pub async fn run_serve(config_path: Option<PathBuf>) -> Result<(), TidingsError> {
    let config = load_validated(config_path)
        .map_err(|errors| TidingsError::Config(errors.join("; ")))?;

    init_tracing(&config.agent.log_level);
    info!(name = %config.agent.name, "starting tidings serve");

    // Persistence: one SQLite database backing the document store and the
    // vector index.
    let store = DocumentStore::open(&config.storage).await?;
    let index = VectorIndex::new(store.database().connection().clone());

    // Providers, each behind its concurrency cap.
    let search: Arc<dyn SearchAdapter> = Arc::new(SerpSearch::new(
        config.search.api_key.clone(),
        config.search.base_url.clone(),
        config.search.rate_per_minute,
        config.search.concurrency,
        Duration::from_secs(config.search.timeout_secs),
    )?);
    let anthropic = Arc::new(
        AnthropicClient::new(
            config.llm.api_key.clone(),
            config.llm.api_version.clone(),
            config.llm.model.clone(),
            Duration::from_secs(config.llm.timeout_secs),
        )?
        .with_base_url(config.llm.base_url.clone()),
    );
    let llm: Arc<dyn CompletionAdapter> = Arc::new(LimitedCompletion::new(
        anthropic,
        config.llm.concurrency,
    ));
    let embeddings = Arc::new(EmbeddingClient::new(
        config.embedding.api_key.clone(),
        config.embedding.base_url.clone(),
        config.embedding.model.clone(),
        config.embedding.dimension,
        Duration::from_secs(config.embedding.timeout_secs),
    )?);
    let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(LimitedEmbedding::new(
        embeddings,
        config.embedding.concurrency,
    ));

    // Core components.
    let memory = Arc::new(UserMemoryStore::new(
        store.clone(),
        embedder.clone(),
        config.memory.clone(),
    ));
    let indexer = Arc::new(EmbeddingIndexer::new(
        index.clone(),
        embedder.clone(),
        config.embedding.batch_size,
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        search.clone(),
        store.clone(),
        indexer,
        llm.clone(),
        SentimentScorer::new(),
        CardSynthesizer::new(llm.clone()),
        memory.clone(),
        config.pipeline.clone(),
    ));
    let retrieval = Arc::new(
        RetrievalEngine::new(
            index.clone(),
            store.clone(),
            embedder.clone(),
            config.retrieval.similarity_floor,
        )
        .with_query_timeout(Duration::from_secs(config.retrieval.query_timeout_secs)),
    );
    let dialogue = Arc::new(DialogueManager::new(
        store.clone(),
        retrieval,
        llm.clone(),
        memory.clone(),
        config.dialogue.clone(),
    ));

    let adapters: Vec<Arc<dyn Adapter>> = vec![
        Arc::new(store.clone()),
        Arc::new(index),
        search_as_adapter(search),
        completion_as_adapter(llm),
        embedding_as_adapter(embedder),
    ];
    let state = AppState::new(orchestrator, dialogue, memory, adapters);

    // Graceful shutdown on SIGINT/SIGTERM.
    let token = install_signal_handler();
    let shutdown = {
        let token = token.clone();
        async move { token.cancelled().await }
    };

    start_server(&config.gateway, state, shutdown).await?;

    info!("gateway stopped, flushing storage");
    store.close().await?;
    Ok(())
}

fn search_as_adapter(adapter: Arc<dyn SearchAdapter>) -> Arc<dyn Adapter> {
    adapter
}

fn completion_as_adapter(adapter: Arc<dyn CompletionAdapter>) -> Arc<dyn Adapter> {
    adapter
}

fn embedding_as_adapter(adapter: Arc<dyn EmbeddingAdapter>) -> Arc<dyn Adapter> {
    adapter
}

/// Installs handlers for SIGTERM and SIGINT; the returned token trips
/// when either signal arrives.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    token_clone.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, initiating shutdown"),
                _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidings={log_level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
