// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret eligibility checks and TLS material extraction

use crate::constants::{secret_keys, TLS_SECRET_TYPE};
use crate::error::{Result, SyncError};
use crate::types::ConfigSpec;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;

/// Why a secret is left alone by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NamespaceNotAllowed(String),
    NotTls(Option<String>),
    LabelMismatch { key: String, expected: String },
    AnnotationMismatch { key: String, expected: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NamespaceNotAllowed(ns) => {
                write!(f, "namespace {} is not in filterMatchingNamespace", ns)
            }
            SkipReason::NotTls(type_) => write!(
                f,
                "secret type is {}, not {}",
                type_.as_deref().unwrap_or("<unset>"),
                TLS_SECRET_TYPE
            ),
            SkipReason::LabelMismatch { key, expected } => {
                write!(f, "label {} does not equal {}", key, expected)
            }
            SkipReason::AnnotationMismatch { key, expected } => {
                write!(f, "annotation {} does not equal {}", key, expected)
            }
        }
    }
}

/// Check if a secret is of type `kubernetes.io/tls`
fn is_tls_secret(secret: &Secret) -> bool {
    secret.type_.as_deref() == Some(TLS_SECRET_TYPE)
}

/// Find the first required entry that the actual map does not carry with an equal value.
///
/// Every required entry must match; an absent or empty requirement matches everything.
pub fn first_mismatch<'a>(
    required: Option<&'a BTreeMap<String, String>>,
    actual: &BTreeMap<String, String>,
) -> Option<(&'a String, &'a String)> {
    required?
        .iter()
        .find(|(key, expected)| actual.get(*key) != Some(*expected))
}

/// Decide whether a secret should be tracked under the given configuration
pub fn check_secret(secret: &Secret, spec: &ConfigSpec) -> std::result::Result<(), SkipReason> {
    let namespace = secret.namespace().unwrap_or_default();
    if !spec.namespace_allowed(&namespace) {
        return Err(SkipReason::NamespaceNotAllowed(namespace));
    }

    if !is_tls_secret(secret) {
        return Err(SkipReason::NotTls(secret.type_.clone()));
    }

    if let Some((key, expected)) = first_mismatch(spec.filter_matching_labels.as_ref(), secret.labels()) {
        return Err(SkipReason::LabelMismatch {
            key: key.clone(),
            expected: expected.clone(),
        });
    }

    if let Some((key, expected)) =
        first_mismatch(spec.filter_matching_annotations.as_ref(), secret.annotations())
    {
        return Err(SkipReason::AnnotationMismatch {
            key: key.clone(),
            expected: expected.clone(),
        });
    }

    Ok(())
}

/// Read the PEM certificate and private key from a TLS secret
pub fn tls_material(secret: &Secret) -> Result<(String, String)> {
    let data = secret.data.as_ref();
    let read = |key: &str| -> Result<String> {
        let bytes = data.and_then(|d| d.get(key)).ok_or_else(|| {
            SyncError::InvalidSecret(format!("secret {} has no {} entry", secret.name_any(), key))
        })?;
        String::from_utf8(bytes.0.clone()).map_err(|_| {
            SyncError::InvalidSecret(format!("{} of secret {} is not UTF-8", key, secret.name_any()))
        })
    };

    Ok((read(secret_keys::TLS_CERT)?, read(secret_keys::TLS_KEY)?))
}
