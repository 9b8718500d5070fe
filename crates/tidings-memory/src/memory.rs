// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The user memory store: interaction recording and derived profiles.
//!
//! The interaction log is the source of truth. Derived fields use
//! epoch-relative exponential weights: an interaction at time `t` carries
//! weight `action_weight * 2^(age_days(t) / half_life)` where age is
//! measured from the profile's creation instant. Relative weights between
//! any two interactions then decay with the configured half-life, the
//! running mean can be folded incrementally in any order, and a full
//! rebuild from the log reproduces the incremental profile exactly
//! (modulo floating-point association).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tidings_config::model::MemoryConfig;
use tidings_core::TidingsError;
use tidings_core::traits::EmbeddingAdapter;
use tidings_core::types::{Fingerprint, InteractionKind, InteractionRecord, UserProfile};
use tidings_store::DocumentStore;
use tracing::{debug, info};

/// Per-user memory store (C7).
pub struct UserMemoryStore {
    store: DocumentStore,
    embedder: Arc<dyn EmbeddingAdapter>,
    config: MemoryConfig,
    /// Per-user update locks keep the running-mean fold race-free.
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl UserMemoryStore {
    pub fn new(
        store: DocumentStore,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            locks: DashMap::new(),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn action_weight(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::Query => self.config.weight_query,
            InteractionKind::View => self.config.weight_view,
            InteractionKind::Like => self.config.weight_like,
            InteractionKind::Share => self.config.weight_share,
            InteractionKind::Dwell => self.config.weight_dwell,
            InteractionKind::DialogueTurn => self.config.weight_dialogue_turn,
        }
    }

    /// Epoch-relative growth factor for an interaction at `at`.
    fn growth(&self, profile_created: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
        let age_days =
            (at - profile_created).num_milliseconds() as f64 / (1000.0 * 86_400.0);
        (age_days / self.config.half_life_days).exp2()
    }

    /// Records one interaction: appends to the log and folds the derived
    /// fields incrementally under the per-user lock.
    pub async fn record(&self, record: InteractionRecord) -> Result<(), TidingsError> {
        let lock = self.user_lock(&record.user_id);
        let _guard = lock.lock().await;

        self.store.append_interaction(record.clone()).await?;

        let mut profile = self
            .store
            .get_profile(&record.user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(&record.user_id, record.at));

        self.fold_interaction(&mut profile, &record).await?;
        profile.updated_at = record.at;
        self.store.put_profile(&profile).await?;

        debug!(user = %record.user_id, kind = %record.kind, "interaction recorded");
        Ok(())
    }

    /// Returns the user's profile, or a fresh default when none exists yet.
    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, TidingsError> {
        Ok(self
            .store
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(user_id, Utc::now())))
    }

    /// Persists user-set style preferences without touching derived fields.
    pub async fn put_style(
        &self,
        user_id: &str,
        style: tidings_core::types::StylePreferences,
    ) -> Result<UserProfile, TidingsError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut profile = self
            .store
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(user_id, Utc::now()));
        profile.style = style;
        self.store.put_profile(&profile).await?;
        Ok(profile)
    }

    /// Rebuilds every derived field from the full interaction log.
    ///
    /// Produces the same profile as the incremental path (modulo
    /// floating-point tolerance); user-set style preferences are preserved.
    pub async fn update_derived(&self, user_id: &str) -> Result<UserProfile, TidingsError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let log = self.store.interactions_for_user(user_id).await?;
        let existing = self.store.get_profile(user_id).await?;

        let created_at = existing
            .as_ref()
            .map(|p| p.created_at)
            .or_else(|| log.first().map(|r| r.at))
            .unwrap_or_else(Utc::now);

        let mut profile = UserProfile::new(user_id, created_at);
        if let Some(existing) = existing {
            profile.style = existing.style;
            profile.preferred_sources = existing.preferred_sources;
        }

        for record in &log {
            self.fold_interaction(&mut profile, record).await?;
            profile.updated_at = record.at;
        }

        self.store.put_profile(&profile).await?;
        info!(user = user_id, interactions = log.len(), "derived profile rebuilt");
        Ok(profile)
    }

    /// Clears all memory state for a user: log and profile.
    pub async fn clear(&self, user_id: &str) -> Result<(), TidingsError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.store.clear_interactions(user_id).await?;
        self.store.delete_profile(user_id).await?;
        info!(user = user_id, "user memory cleared");
        Ok(())
    }

    /// Folds one interaction into the derived fields.
    async fn fold_interaction(
        &self,
        profile: &mut UserProfile,
        record: &InteractionRecord,
    ) -> Result<(), TidingsError> {
        match record.kind {
            InteractionKind::Query => profile.counters.queries_issued += 1,
            InteractionKind::View => profile.counters.articles_viewed += 1,
            InteractionKind::Like => profile.counters.cards_liked += 1,
            _ => {}
        }

        let weight = self.action_weight(record.kind) * self.growth(profile.created_at, record.at);

        // Interest vector: running weighted mean of interaction-text
        // embeddings.
        if let Some(text) = record.text.as_deref()
            && !text.trim().is_empty()
        {
            let vectors = self.embedder.embed(&[text.to_string()]).await?;
            if let Some(vector) = vectors.into_iter().next() {
                fold_mean(
                    &mut profile.interest_vector,
                    &mut profile.interest_weight,
                    &vector,
                    weight,
                );
            }
        }

        // Category weights: categories come from the target article, so a
        // rebuild from the log alone can reproduce them.
        if let Some(target) = record.target.as_deref()
            && let Ok(fp) = target.parse::<uuid::Uuid>()
        {
            let articles = self
                .store
                .get_by_fingerprints(&[Fingerprint(fp)])
                .await?;
            if let Some(article) = articles.first() {
                *profile
                    .category_accumulator
                    .entry(article.category.clone())
                    .or_insert(0.0) += weight;
            }
        }
        profile.category_weights = normalize_categories(&profile.category_accumulator);
        Ok(())
    }
}

/// Folds a weighted observation into a running mean vector.
fn fold_mean(mean: &mut Vec<f32>, total_weight: &mut f64, vector: &[f32], weight: f64) {
    if mean.is_empty() {
        *mean = vector.to_vec();
        *total_weight = weight;
        return;
    }
    if mean.len() != vector.len() {
        // Dimension changed (new embedding model); restart the mean.
        *mean = vector.to_vec();
        *total_weight = weight;
        return;
    }
    let new_total = *total_weight + weight;
    for (m, v) in mean.iter_mut().zip(vector.iter()) {
        *m = ((*m as f64 * *total_weight + *v as f64 * weight) / new_total) as f32;
    }
    *total_weight = new_total;
}

/// Normalizes the raw accumulator to a distribution summing to 1.
fn normalize_categories(accumulator: &BTreeMap<String, f64>) -> BTreeMap<String, f32> {
    let total: f64 = accumulator.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    accumulator
        .iter()
        .map(|(k, v)| (k.clone(), (v / total) as f32))
        .collect()
}

/// The user's top categories by weight, heaviest first.
pub fn top_categories(profile: &UserProfile, n: usize) -> Vec<(String, f32)> {
    let mut entries: Vec<(String, f32)> = profile
        .category_weights
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(n);
    entries
}
