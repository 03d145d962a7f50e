// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Outcome of the last operation recorded on a resource
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum SyncState {
    Success,
    Failed,
}

/// Status shared by Config, ClusterConfig and SyncSecretAKV
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SyncStatus {
    #[serde(rename = "syncStatus", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SyncState>,
    #[serde(rename = "syncStatusMessage", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncStatus {
    pub fn success(message: impl Into<String>) -> Self {
        SyncStatus {
            state: Some(SyncState::Success),
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        SyncStatus {
            state: Some(SyncState::Failed),
            message: Some(message.into()),
        }
    }
}
