// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Certificate store abstraction, Key Vault client construction, and PEM transcoding.

pub mod codec;
pub mod credential;
pub mod keyvault;

use crate::config::AmbientCredentials;
use crate::error::Result;
use crate::types::ConfigSpec;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub use codec::{assemble_full_chain, to_store_encoding};
pub use credential::{AzureCredential, CredentialMode};
pub use keyvault::KeyVaultClient;

/// A certificate listed in the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateItem {
    pub name: String,
}

/// Operations the operator needs from an external certificate vault
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Create or replace a certificate from a combined certificate + key PEM bundle
    async fn import_certificate(&self, name: &str, combined_pem: &str) -> Result<()>;

    /// List all certificates, following server-side pagination
    async fn list_certificates(&self) -> Result<Vec<CertificateItem>>;

    /// Soft-delete a certificate. Returns `SyncError::CertificateNotFound` when absent.
    async fn delete_certificate(&self, name: &str) -> Result<()>;

    /// Permanently remove a soft-deleted certificate. Returns `SyncError::CertificateNotFound` when absent.
    async fn purge_deleted_certificate(&self, name: &str) -> Result<()>;
}

/// Builds a certificate store handle for an effective configuration
pub trait CertificateStoreFactory: Send + Sync {
    fn build(&self, spec: &ConfigSpec) -> Result<Arc<dyn CertificateStore>>;
}

/// Factory producing Azure Key Vault clients.
///
/// Credentials are shared per credential mode so their token caches outlive a single pass.
pub struct KeyVaultFactory {
    http: reqwest::Client,
    ambient: AmbientCredentials,
    credentials: Mutex<HashMap<CredentialMode, Arc<AzureCredential>>>,
}

impl KeyVaultFactory {
    pub fn new(ambient: AmbientCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            ambient,
            credentials: Mutex::new(HashMap::new()),
        }
    }

    fn credential(&self, mode: CredentialMode) -> Arc<AzureCredential> {
        let mut credentials = self.credentials.lock().unwrap_or_else(|e| e.into_inner());
        credentials
            .entry(mode)
            .or_insert_with_key(|mode| {
                Arc::new(AzureCredential::new(
                    mode.clone(),
                    self.ambient.clone(),
                    self.http.clone(),
                ))
            })
            .clone()
    }
}

impl CertificateStoreFactory for KeyVaultFactory {
    fn build(&self, spec: &ConfigSpec) -> Result<Arc<dyn CertificateStore>> {
        let mode = CredentialMode::select(spec);
        debug!(
            "Building Key Vault client for {} with {} credential",
            spec.az_key_vault_url,
            mode.kind()
        );

        let credential = self.credential(mode);
        let client = KeyVaultClient::new(&spec.az_key_vault_url, self.http.clone(), credential)?;
        Ok(Arc::new(client))
    }
}
