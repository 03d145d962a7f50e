// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::status::SyncStatus;
use kube::api::ObjectMeta;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

fn default_allow_deletion() -> bool {
    true
}

/// Namespaced vault configuration. Takes precedence over any ClusterConfig.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "api.syncsecretakv.io", version = "v1alpha1", kind = "Config")]
#[kube(namespaced)]
#[kube(status = "SyncStatus")]
#[kube(printcolumn = r#"{"name":"Vault","type":"string","jsonPath":".spec.azKeyVaultURL"}"#)]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.syncStatus"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    #[serde(rename = "azKeyVaultURL")]
    pub az_key_vault_url: String,
    #[serde(
        default,
        rename = "azKeyVaultClientId",
        alias = "azKeyvaultClientId",
        skip_serializing_if = "Option::is_none"
    )]
    pub az_key_vault_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az_key_vault_client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az_key_vault_tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_matching_labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_matching_annotations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_matching_namespace: Option<Vec<String>>,
    #[serde(default = "default_allow_deletion")]
    pub allow_az_key_vault_certificate_deletion: bool,
}

/// Cluster-scoped vault configuration, used only when no Config exists.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "api.syncsecretakv.io", version = "v1alpha1", kind = "ClusterConfig")]
#[kube(status = "SyncStatus")]
#[kube(printcolumn = r#"{"name":"Vault","type":"string","jsonPath":".spec.azKeyVaultURL"}"#)]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.syncStatus"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfigSpec {
    #[serde(rename = "azKeyVaultURL")]
    pub az_key_vault_url: String,
    #[serde(
        default,
        rename = "azKeyVaultClientId",
        alias = "azKeyvaultClientId",
        skip_serializing_if = "Option::is_none"
    )]
    pub az_key_vault_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az_key_vault_client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az_key_vault_tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_matching_labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_matching_annotations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_matching_namespace: Option<Vec<String>>,
    #[serde(default = "default_allow_deletion")]
    pub allow_az_key_vault_certificate_deletion: bool,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        ConfigSpec {
            az_key_vault_url: String::new(),
            az_key_vault_client_id: None,
            az_key_vault_client_secret: None,
            az_key_vault_tenant_id: None,
            filter_matching_labels: None,
            filter_matching_annotations: None,
            filter_matching_namespace: None,
            allow_az_key_vault_certificate_deletion: true,
        }
    }
}

impl From<ClusterConfigSpec> for ConfigSpec {
    fn from(spec: ClusterConfigSpec) -> Self {
        ConfigSpec {
            az_key_vault_url: spec.az_key_vault_url,
            az_key_vault_client_id: spec.az_key_vault_client_id,
            az_key_vault_client_secret: spec.az_key_vault_client_secret,
            az_key_vault_tenant_id: spec.az_key_vault_tenant_id,
            filter_matching_labels: spec.filter_matching_labels,
            filter_matching_annotations: spec.filter_matching_annotations,
            filter_matching_namespace: spec.filter_matching_namespace,
            allow_az_key_vault_certificate_deletion: spec.allow_az_key_vault_certificate_deletion,
        }
    }
}

impl From<ClusterConfig> for Config {
    fn from(cluster_config: ClusterConfig) -> Self {
        Config {
            metadata: ObjectMeta {
                name: cluster_config.metadata.name,
                labels: cluster_config.metadata.labels,
                annotations: cluster_config.metadata.annotations,
                ..Default::default()
            },
            spec: cluster_config.spec.into(),
            status: cluster_config.status,
        }
    }
}

impl ConfigSpec {
    /// Name of the vault, taken from the first DNS label of the vault URL
    pub fn vault_name(&self) -> String {
        Url::parse(&self.az_key_vault_url)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.split('.').next().unwrap_or(h).to_string()))
            .unwrap_or_else(|| self.az_key_vault_url.clone())
    }

    /// Check the namespace allow-list of this configuration
    pub fn namespace_allowed(&self, namespace: &str) -> bool {
        match &self.filter_matching_namespace {
            Some(namespaces) if !namespaces.is_empty() => namespaces.iter().any(|ns| ns == namespace),
            _ => true,
        }
    }
}

/// Where the effective configuration was found
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Namespaced(Config),
    ClusterWide(ClusterConfig),
}

impl ConfigSource {
    /// Collapse the source into a namespaced Config
    pub fn into_config(self) -> Config {
        match self {
            ConfigSource::Namespaced(config) => config,
            ConfigSource::ClusterWide(cluster_config) => cluster_config.into(),
        }
    }

    /// Human readable reference for logging, e.g. `Config vws/default`
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Namespaced(config) => format!(
                "Config {}/{}",
                config.namespace().unwrap_or_default(),
                config.name_any()
            ),
            ConfigSource::ClusterWide(cluster_config) => {
                format!("ClusterConfig {}", cluster_config.name_any())
            }
        }
    }
}
