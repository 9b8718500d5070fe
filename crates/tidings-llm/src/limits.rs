// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-global concurrency caps for provider adapters.
//!
//! Wraps an adapter with a semaphore so in-flight calls never exceed the
//! declared provider limit. Permits are scoped, so they release even when
//! the wrapped call fails or is cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use tidings_core::TidingsError;
use tidings_core::traits::{
    Adapter, CompletionAdapter, CompletionRequest, CompletionResponse, EmbeddingAdapter,
    HealthStatus, OutputSchema, TokenUsage,
};
use tokio::sync::Semaphore;

/// A completion adapter bounded by a concurrency semaphore.
pub struct LimitedCompletion<C> {
    inner: Arc<C>,
    permits: Semaphore,
}

impl<C: CompletionAdapter> LimitedCompletion<C> {
    pub fn new(inner: Arc<C>, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(max_in_flight.max(1)),
        }
    }
}

#[async_trait]
impl<C: CompletionAdapter> Adapter for LimitedCompletion<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl<C: CompletionAdapter> CompletionAdapter for LimitedCompletion<C> {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, TidingsError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TidingsError::Cancelled)?;
        self.inner.complete(request).await
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<(serde_json::Value, TokenUsage), TidingsError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TidingsError::Cancelled)?;
        self.inner.complete_structured(request, schema).await
    }
}

/// An embedding adapter bounded by a concurrency semaphore.
pub struct LimitedEmbedding<E> {
    inner: Arc<E>,
    permits: Semaphore,
}

impl<E: EmbeddingAdapter> LimitedEmbedding<E> {
    pub fn new(inner: Arc<E>, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(max_in_flight.max(1)),
        }
    }
}

#[async_trait]
impl<E: EmbeddingAdapter> Adapter for LimitedEmbedding<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl<E: EmbeddingAdapter> EmbeddingAdapter for LimitedEmbedding<E> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TidingsError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TidingsError::Cancelled)?;
        self.inner.embed(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
