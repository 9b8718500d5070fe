// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pipeline orchestrator: composes search, storage, indexing,
//! sentiment, analysis, card synthesis, and memory update as a staged job.
//!
//! Stage policy:
//! - search failure is fatal (nothing to do);
//! - store failure downgrades the run to in-memory for its remainder;
//! - index, sentiment, analysis, cards, and memory failures are recorded
//!   as warnings on the run;
//! - the overall deadline cancels outstanding stages, and a cancelled
//!   stage records `cancelled`, not `failed`.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tidings_cards::CardSynthesizer;
use tidings_config::model::PipelineConfig;
use tidings_core::TidingsError;
use tidings_core::traits::{CompletionAdapter, Lookback, SearchAdapter, SearchOptions};
use tidings_core::types::{
    Article, Fingerprint, InteractionKind, InteractionRecord, PipelineRequest, PipelineRun,
    RawArticle, RunCounts, RunStatus, Sentiment, Stage, StageOutcome, StageRecord,
    UserProfile,
};
use tidings_index::EmbeddingIndexer;
use tidings_memory::UserMemoryStore;
use tidings_sentiment::SentimentScorer;
use tidings_store::DocumentStore;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::admission::AdmissionControl;
use crate::analysis::{generate_analysis, recommended_queries, sentiment_overview};

/// The pipeline orchestrator (C8).
pub struct Orchestrator {
    search: Arc<dyn SearchAdapter>,
    store: DocumentStore,
    indexer: Arc<EmbeddingIndexer>,
    llm: Arc<dyn CompletionAdapter>,
    scorer: SentimentScorer,
    cards: CardSynthesizer,
    memory: Arc<UserMemoryStore>,
    config: PipelineConfig,
    admission: AdmissionControl,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        search: Arc<dyn SearchAdapter>,
        store: DocumentStore,
        indexer: Arc<EmbeddingIndexer>,
        llm: Arc<dyn CompletionAdapter>,
        scorer: SentimentScorer,
        cards: CardSynthesizer,
        memory: Arc<UserMemoryStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            search,
            store,
            indexer,
            llm,
            scorer,
            cards,
            memory,
            config,
            admission: AdmissionControl::new(),
        }
    }

    /// Runs the full pipeline for one request.
    ///
    /// Admission errors (`BusyRetry`) and invalid requests surface as
    /// `Err`; everything after admission is reported on the returned
    /// [`PipelineRun`].
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineRun, TidingsError> {
        let request = request.clamped();
        if request.query.trim().is_empty() {
            return Err(TidingsError::Config("query must not be empty".into()));
        }
        let _admission = self.admission.admit(&request.user_id, request.queue).await?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let started = Instant::now();
        let deadline = started + Duration::from_secs(self.config.deadline_secs.max(1));
        info!(run_id = %run_id, query = %request.query, user = %request.user_id, "pipeline run started");

        let mut run = PipelineRun {
            run_id,
            user_id: request.user_id.clone(),
            query: request.query.clone(),
            status: RunStatus::Success,
            stages: Vec::new(),
            counts: RunCounts::default(),
            articles: Vec::new(),
            cards: Vec::new(),
            analysis: None,
            sentiment_overview: None,
            recommended_queries: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            started_at,
            duration_ms: 0,
        };

        // --- Stage: search (fatal on failure) ---
        let opts = SearchOptions {
            num: request.num_results,
            language: request.language.clone(),
            country: request.country.clone(),
            window: Lookback::from_str(&request.window).unwrap_or(Lookback::Day),
        };
        let (record, found) = run_stage(
            Stage::Search,
            deadline,
            self.search.search(&request.query, &opts),
        )
        .await;
        let search_error = record.error.clone();
        run.stages.push(record);

        let Some(raws) = found else {
            run.status = RunStatus::Failed;
            run.errors
                .push(search_error.unwrap_or_else(|| "search did not complete".into()));
            return Ok(self.finalize(run, None, started).await);
        };
        run.counts.found = raws.len();
        if raws.is_empty() {
            // Nothing to process; downstream stages are not invoked.
            return Ok(self.finalize(run, None, started).await);
        }

        // --- Stage: store (downgrades to in-memory on failure) ---
        let now = Utc::now();
        let mut store_ok = false;
        let articles: Vec<Article> = if request.store {
            let (record, outcome) = run_stage(
                Stage::Store,
                deadline,
                self.store.upsert_many(raws.clone(), &request.query, now),
            )
            .await;
            run.stages.push(record);
            match outcome {
                Some(outcome) => {
                    store_ok = true;
                    run.counts.stored = outcome.stored;
                    run.counts.duplicates = outcome.duplicates;
                    outcome.articles
                }
                None => {
                    run.warnings
                        .push("article store unavailable; continuing in-memory".into());
                    in_memory_articles(raws, &request.query)
                }
            }
        } else {
            run.stages.push(skipped(Stage::Store));
            in_memory_articles(raws, &request.query)
        };

        let profile = self.load_profile(&request.user_id).await;

        // --- Sibling stages: index, sentiment, whole-corpus analysis ---
        let index_stage = async {
            if request.index && store_ok {
                run_stage(Stage::Index, deadline, self.index_articles(&articles)).await
            } else {
                (skipped(Stage::Index), None)
            }
        };
        let sentiment_stage = async {
            if request.sentiment {
                run_stage(Stage::Sentiment, deadline, async {
                    Ok::<_, TidingsError>(self.score_articles(&articles))
                })
                .await
            } else {
                (skipped(Stage::Sentiment), None)
            }
        };
        let analysis_stage = async {
            if request.analyze {
                run_stage(
                    Stage::Analysis,
                    deadline,
                    generate_analysis(self.llm.as_ref(), &request.query, &articles),
                )
                .await
            } else {
                (skipped(Stage::Analysis), None)
            }
        };

        let (
            (index_record, index_outcome),
            (sentiment_record, sentiment_outcome),
            (analysis_record, analysis_outcome),
        ) = tokio::join!(index_stage, sentiment_stage, analysis_stage);

        if index_record.outcome == StageOutcome::Failed {
            run.warnings.push(format!(
                "index stage failed: {}",
                index_record.error.clone().unwrap_or_default()
            ));
        }
        run.stages.push(index_record);
        if let Some((chunks, index_warnings)) = index_outcome {
            run.counts.indexed_chunks = chunks;
            run.warnings.extend(index_warnings);
        }

        run.stages.push(sentiment_record);
        let sentiments: HashMap<Fingerprint, Sentiment> =
            sentiment_outcome.clone().unwrap_or_default();
        if request.sentiment && !sentiments.is_empty() {
            let verdicts: Vec<Sentiment> = articles
                .iter()
                .filter_map(|a| sentiments.get(&a.fingerprint).copied())
                .collect();
            run.sentiment_overview = sentiment_overview(&verdicts);
        }

        if analysis_record.outcome == StageOutcome::Failed {
            run.warnings.push(format!(
                "analysis stage failed: {}",
                analysis_record.error.clone().unwrap_or_default()
            ));
        }
        run.stages.push(analysis_record);
        run.analysis = analysis_outcome;

        // --- Stage: cards ---
        if request.cards {
            let (record, outcome) = run_stage(Stage::Cards, deadline, async {
                Ok::<_, TidingsError>(
                    self.cards
                        .synthesize(
                            &articles,
                            &sentiments,
                            request.max_cards,
                            profile.as_ref(),
                            Utc::now(),
                        )
                        .await,
                )
            })
            .await;
            run.stages.push(record);
            if let Some(result) = outcome {
                run.counts.cards = result.cards.len();
                run.cards = result.cards;
                run.warnings.extend(result.warnings);
            }
        } else {
            run.stages.push(skipped(Stage::Cards));
        }

        // --- Stage: memory update ---
        if request.memory_update && !request.user_id.is_empty() {
            let interaction = InteractionRecord {
                id: Uuid::new_v4().to_string(),
                user_id: request.user_id.clone(),
                at: Utc::now(),
                kind: InteractionKind::Query,
                target: None,
                text: Some(request.query.clone()),
                importance: 0.7,
            };
            let (record, _) = run_stage(
                Stage::Memory,
                deadline,
                self.memory.record(interaction),
            )
            .await;
            if record.outcome == StageOutcome::Failed {
                run.warnings.push(format!(
                    "memory stage failed: {}",
                    record.error.clone().unwrap_or_default()
                ));
            }
            run.stages.push(record);
        } else {
            run.stages.push(skipped(Stage::Memory));
        }

        run.articles = articles;
        Ok(self.finalize(run, profile, started).await)
    }

    /// Fetches a retained run by id.
    pub async fn get_run(&self, run_id: &str) -> Result<PipelineRun, TidingsError> {
        self.store
            .get_run(run_id, Utc::now())
            .await?
            .ok_or_else(|| TidingsError::NotFound {
                entity: "run",
                id: run_id.to_string(),
            })
    }

    async fn load_profile(&self, user_id: &str) -> Option<UserProfile> {
        if user_id.is_empty() {
            return None;
        }
        match self.memory.get_profile(user_id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(user = user_id, error = %e, "profile load failed");
                None
            }
        }
    }

    /// Indexes every article; per-article failures degrade to warnings
    /// unless nothing at all was indexed.
    async fn index_articles(
        &self,
        articles: &[Article],
    ) -> Result<(usize, Vec<String>), TidingsError> {
        let mut chunks = 0usize;
        let mut warnings = Vec::new();
        let mut failures = 0usize;
        let mut last_error: Option<TidingsError> = None;

        for article in articles {
            match self.indexer.index_article(article, false).await {
                Ok(outcome) => {
                    chunks += outcome.chunks_indexed;
                    if outcome.partially_indexed {
                        warnings.push(format!(
                            "article {} partially indexed",
                            article.fingerprint
                        ));
                    }
                }
                Err(e) => {
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if chunks == 0 && failures > 0 {
            return Err(last_error.unwrap_or_else(|| {
                TidingsError::Internal("indexing produced nothing".into())
            }));
        }
        if failures > 0 {
            warnings.push(format!("{failures} articles failed to index"));
        }
        Ok((chunks, warnings))
    }

    fn score_articles(&self, articles: &[Article]) -> HashMap<Fingerprint, Sentiment> {
        let texts: Vec<String> = articles
            .iter()
            .map(|a| format!("{} {}", a.title, a.summary))
            .collect();
        let verdicts = self.scorer.score(&texts);
        articles
            .iter()
            .zip(verdicts)
            .map(|(a, s)| (a.fingerprint, s))
            .collect()
    }

    async fn finalize(
        &self,
        mut run: PipelineRun,
        profile: Option<UserProfile>,
        started: Instant,
    ) -> PipelineRun {
        if run.status != RunStatus::Failed
            && run.stages.iter().any(|s| {
                matches!(s.outcome, StageOutcome::Failed | StageOutcome::Cancelled)
            })
        {
            run.status = RunStatus::PartialSuccess;
        }
        run.recommended_queries = recommended_queries(profile.as_ref());
        run.duration_ms = started.elapsed().as_millis() as u64;

        // Run retention is best-effort; a cold store must not fail the run.
        if let Err(e) = self
            .store
            .put_run(&run, self.config.run_ttl_days, Utc::now())
            .await
        {
            warn!(run_id = %run.run_id, error = %e, "run retention failed");
            run.warnings.push("run was not retained".into());
        }

        info!(
            run_id = %run.run_id,
            status = %run.status,
            found = run.counts.found,
            stored = run.counts.stored,
            indexed = run.counts.indexed_chunks,
            cards = run.counts.cards,
            duration_ms = run.duration_ms,
            "pipeline run finished"
        );
        run
    }
}

/// Builds unstored articles when the store stage is disabled or down.
/// Fingerprints still come from the store crate's computation, so an
/// eventual re-run with storage enabled dedups against these identities.
fn in_memory_articles(raws: Vec<RawArticle>, query: &str) -> Vec<Article> {
    let now = Utc::now();
    let mut seen = std::collections::BTreeSet::new();
    raws.into_iter()
        .filter_map(|raw| {
            let fp = tidings_store::fingerprint::fingerprint_for(&raw, now);
            if !seen.insert(fp) {
                return None;
            }
            Some(Article {
                fingerprint: fp,
                title: raw.title,
                summary: raw.summary,
                body: raw.body,
                url: raw.url,
                source: raw.source,
                author: raw.author,
                published_at: raw.published_at.unwrap_or(now),
                language: raw.language,
                category: raw.category.unwrap_or_else(|| "general".to_string()),
                tags: raw.tags,
                query: query.to_string(),
                discovered_at: now,
                last_seen_at: now,
            })
        })
        .collect()
}

fn skipped(stage: Stage) -> StageRecord {
    StageRecord {
        stage,
        outcome: StageOutcome::Skipped,
        error_kind: None,
        error: None,
        duration_ms: 0,
    }
}

/// Runs one stage under the shared deadline, producing its record.
async fn run_stage<T, F>(stage: Stage, deadline: Instant, fut: F) -> (StageRecord, Option<T>)
where
    F: Future<Output = Result<T, TidingsError>>,
{
    let stage_start = Instant::now();
    if stage_start >= deadline {
        return (
            StageRecord {
                stage,
                outcome: StageOutcome::Cancelled,
                error_kind: Some("deadline_exceeded".into()),
                error: Some("pipeline deadline expired before stage start".into()),
                duration_ms: 0,
            },
            None,
        );
    }

    match tokio::time::timeout_at(deadline, fut).await {
        Ok(Ok(value)) => (
            StageRecord {
                stage,
                outcome: StageOutcome::Success,
                error_kind: None,
                error: None,
                duration_ms: stage_start.elapsed().as_millis() as u64,
            },
            Some(value),
        ),
        Ok(Err(e)) => {
            warn!(stage = %stage, error = %e, "stage failed");
            (
                StageRecord {
                    stage,
                    outcome: StageOutcome::Failed,
                    error_kind: Some(e.kind().to_string()),
                    error: Some(e.to_string()),
                    duration_ms: stage_start.elapsed().as_millis() as u64,
                },
                None,
            )
        }
        Err(_) => {
            warn!(stage = %stage, "stage cancelled by pipeline deadline");
            (
                StageRecord {
                    stage,
                    outcome: StageOutcome::Cancelled,
                    error_kind: Some("deadline_exceeded".into()),
                    error: Some("pipeline deadline expired".into()),
                    duration_ms: stage_start.elapsed().as_millis() as u64,
                },
                None,
            )
        }
    }
}
