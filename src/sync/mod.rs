// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret eligibility and tracking-object bookkeeping.

pub mod secrets;
pub mod tracking;

pub use secrets::{check_secret, tls_material, SkipReason};
pub use tracking::{delete_tracking, mark_synced, upsert_tracking, UpsertOutcome};
