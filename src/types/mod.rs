// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources owned by the operator.

pub mod config;
pub mod status;
pub mod sync_secret;

pub use config::{ClusterConfig, ClusterConfigSpec, Config, ConfigSource, ConfigSpec};
pub use status::{SyncState, SyncStatus};
pub use sync_secret::{SyncSecretAKV, SyncSecretAKVSpec};
