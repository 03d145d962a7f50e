// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::vault::DEFAULT_PURGE_GRACE_SECS;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    /// Namespaces whose secrets are synced; empty means all namespaces
    pub watch_namespaces: Vec<String>,
    /// Delay between deleting a certificate and purging it
    pub purge_grace_period: Duration,
    /// Deadline for a single reconciliation pass
    pub reconcile_timeout: Duration,
    /// Snapshot of the ambient Azure credential variables
    pub ambient_credentials: AmbientCredentials,
}

/// Azure credential settings discovered from the process environment at startup.
///
/// Only consulted when a Config carries no explicit credentials. The operator
/// never writes these variables back.
#[derive(Clone, Default)]
pub struct AmbientCredentials {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub federated_token_file: Option<String>,
    pub authority_host: Option<String>,
}

impl std::fmt::Debug for AmbientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("federated_token_file", &self.federated_token_file)
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let watch_namespaces = non_empty("WATCH_NAMESPACES")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|ns| !ns.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let purge_grace_secs = match non_empty("PURGE_GRACE_PERIOD_SECS") {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("PURGE_GRACE_PERIOD_SECS is not a number: {}", v))?,
            None => DEFAULT_PURGE_GRACE_SECS,
        };

        let reconcile_timeout_secs = match non_empty("RECONCILE_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("RECONCILE_TIMEOUT_SECS is not a number: {}", v))?,
            None => DEFAULT_RECONCILE_TIMEOUT_SECS,
        };

        let ambient_credentials = AmbientCredentials {
            tenant_id: non_empty("AZURE_TENANT_ID"),
            client_id: non_empty("AZURE_CLIENT_ID"),
            client_secret: non_empty("AZURE_CLIENT_SECRET"),
            federated_token_file: non_empty("AZURE_FEDERATED_TOKEN_FILE"),
            authority_host: non_empty("AZURE_AUTHORITY_HOST"),
        };

        Ok(Settings {
            watch_namespaces,
            purge_grace_period: Duration::from_secs(purge_grace_secs),
            reconcile_timeout: Duration::from_secs(reconcile_timeout_secs),
            ambient_credentials,
        })
    }

    /// Check the operator-level namespace allow-list
    pub fn namespace_allowed(&self, namespace: &str) -> bool {
        self.watch_namespaces.is_empty() || self.watch_namespaces.iter().any(|ns| ns == namespace)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            watch_namespaces: Vec::new(),
            purge_grace_period: Duration::from_secs(DEFAULT_PURGE_GRACE_SECS),
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            ambient_credentials: AmbientCredentials::default(),
        }
    }
}
