// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user run admission: at most one active pipeline run per user, with
//! an optional wait queue of depth one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tidings_core::TidingsError;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
struct UserGate {
    gate: Arc<Mutex<()>>,
    queued: AtomicUsize,
}

/// Admission controller keyed by user id.
#[derive(Default)]
pub struct AdmissionControl {
    gates: DashMap<String, Arc<UserGate>>,
}

/// Held for the duration of a run; admission releases on drop.
pub struct AdmissionGuard {
    _guard: Option<OwnedMutexGuard<()>>,
}

impl AdmissionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a run for `user_id`.
    ///
    /// Anonymous requests (empty user id) are never serialized. With
    /// `queue` false, a collision fails `BusyRetry` immediately; with
    /// `queue` true, one request may wait behind the active run and any
    /// further request fails `BusyRetry`.
    pub async fn admit(
        &self,
        user_id: &str,
        queue: bool,
    ) -> Result<AdmissionGuard, TidingsError> {
        if user_id.is_empty() {
            return Ok(AdmissionGuard { _guard: None });
        }
        let gate = self
            .gates
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(UserGate::default()))
            .clone();

        if !queue {
            match gate.gate.clone().try_lock_owned() {
                Ok(guard) => Ok(AdmissionGuard {
                    _guard: Some(guard),
                }),
                Err(_) => Err(TidingsError::BusyRetry {
                    user_id: user_id.to_string(),
                }),
            }
        } else {
            // Bounded queue: one waiter at most.
            if gate.queued.fetch_add(1, Ordering::SeqCst) >= 1 {
                gate.queued.fetch_sub(1, Ordering::SeqCst);
                return Err(TidingsError::BusyRetry {
                    user_id: user_id.to_string(),
                });
            }
            let guard = gate.gate.clone().lock_owned().await;
            gate.queued.fetch_sub(1, Ordering::SeqCst);
            Ok(AdmissionGuard {
                _guard: Some(guard),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_run_for_same_user_is_rejected() {
        let control = AdmissionControl::new();
        let _first = control.admit("u1", false).await.unwrap();
        let second = control.admit("u1", false).await;
        assert!(matches!(second, Err(TidingsError::BusyRetry { .. })));
    }

    #[tokio::test]
    async fn different_users_run_concurrently() {
        let control = AdmissionControl::new();
        let _a = control.admit("u1", false).await.unwrap();
        let _b = control.admit("u2", false).await.unwrap();
    }

    #[tokio::test]
    async fn anonymous_requests_are_not_serialized() {
        let control = AdmissionControl::new();
        let _a = control.admit("", false).await.unwrap();
        let _b = control.admit("", false).await.unwrap();
    }

    #[tokio::test]
    async fn queued_request_waits_then_proceeds() {
        let control = Arc::new(AdmissionControl::new());
        let first = control.admit("u1", false).await.unwrap();

        let control2 = control.clone();
        let waiter = tokio::spawn(async move { control2.admit("u1", true).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "queued request must wait");

        drop(first);
        let admitted = waiter.await.unwrap();
        assert!(admitted.is_ok());
    }

    #[tokio::test]
    async fn queue_depth_is_bounded_at_one() {
        let control = Arc::new(AdmissionControl::new());
        let _first = control.admit("u1", false).await.unwrap();

        let control2 = control.clone();
        let _waiter = tokio::spawn(async move {
            let _g = control2.admit("u1", true).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Third request: the queue slot is taken.
        let third = control.admit("u1", true).await;
        assert!(matches!(third, Err(TidingsError::BusyRetry { .. })));
    }
}
