// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::finalizers;
use crate::types::status::SyncStatus;
use k8s_openapi::api::core::v1::Secret;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Tracking object linking a secret's last observed version to its last synced version.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "api.syncsecretakv.io", version = "v1alpha1", kind = "SyncSecretAKV")]
#[kube(namespaced)]
#[kube(plural = "syncsecretakvs")]
#[kube(status = "SyncStatus")]
#[kube(printcolumn = r#"{"name":"Secret","type":"string","jsonPath":".spec.secretName"}"#)]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.syncStatus"}"#)]
#[serde(rename_all = "camelCase")]
pub struct SyncSecretAKVSpec {
    pub vault_name: String,
    pub secret_name: String,
    pub secret_resource_version: String,
    #[serde(default)]
    pub synced_resource_version: String,
}

impl SyncSecretAKV {
    /// Build a fresh tracking object for a secret that has never been synced
    pub fn for_secret(secret: &Secret, vault_name: &str) -> Self {
        let mut tracking = SyncSecretAKV::new(
            &secret.name_any(),
            SyncSecretAKVSpec {
                vault_name: vault_name.to_string(),
                secret_name: secret.name_any(),
                secret_resource_version: secret.resource_version().unwrap_or_default(),
                synced_resource_version: String::new(),
            },
        );
        tracking.metadata.namespace = secret.namespace();
        tracking.metadata.finalizers = Some(vec![finalizers::CERTIFICATE.to_string()]);
        tracking
    }

    /// Whether the vault already reflects the last observed secret version
    pub fn is_synced(&self) -> bool {
        self.spec.synced_resource_version == self.spec.secret_resource_version
    }

    /// Name of the vault certificate: `{namespace}-{name}`
    pub fn certificate_name(&self) -> String {
        format!("{}-{}", self.namespace().unwrap_or_default(), self.name_any())
    }
}
