// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod articles;
pub mod interactions;
pub mod profiles;
pub mod runs;
pub mod sessions;
