// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Certificate encoding failed: {0}")]
    CodecError(String),

    #[error("Credential acquisition failed: {0}")]
    CredentialError(String),

    #[error("Certificate not found in Key Vault: {0}")]
    CertificateNotFound(String),

    #[error("Key Vault request failed: {0}")]
    ConnectionError(String),

    #[error("Write conflict: {0}")]
    ConflictError(String),

    #[error("Ambiguous configuration: {0}")]
    AmbiguousConfig(String),

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Reconciliation timed out after {0:?}")]
    Timeout(Duration),
}

impl SyncError {
    /// Whether this error only signals an absent object or configuration
    pub fn is_not_found(&self) -> bool {
        match self {
            SyncError::NotFound(_) => true,
            SyncError::KubeError(e) => is_kube_not_found(e),
            _ => false,
        }
    }

    /// Whether the vault reported the certificate as absent
    pub fn is_missing_certificate(&self) -> bool {
        matches!(self, SyncError::CertificateNotFound(_))
    }
}

/// Check if a Kubernetes API error is a 404
pub fn is_kube_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(err) if err.code == 404)
}

/// Check if a Kubernetes API error is an optimistic-concurrency collision
pub fn is_kube_conflict(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(err) if err.code == 409)
}

pub type Result<T> = std::result::Result<T, SyncError>;
