// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Tidings pipeline and dialogue surface.
//!
//! JSON over HTTP/1.1 with a uniform `{success, data | error}` envelope,
//! bearer-token auth on API routes, and a public health endpoint with a
//! per-provider reachability summary.

pub mod auth;
pub mod envelope;
pub mod handlers;
pub mod server;

pub use server::{AppState, build_router, start_server};
