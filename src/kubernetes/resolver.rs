// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Effective configuration lookup with namespaced-first, cluster-wide fallback.

use crate::error::{Result, SyncError};
use crate::types::{ClusterConfig, Config, ConfigSource};
use kube::{api::ListParams, Api, Client, ResourceExt};
use tracing::{debug, instrument, warn};

/// Resolve the effective configuration.
///
/// Any namespaced Config wins over every ClusterConfig. When several candidates exist in the
/// winning scope the first one returned by the API server is used. List failures are propagated;
/// only an empty result falls through to the next scope.
#[instrument(skip(client))]
pub async fn resolve_config(client: &Client) -> Result<ConfigSource> {
    let configs: Api<Config> = Api::all(client.clone());
    let config_list = configs.list(&ListParams::default()).await?;

    if config_list.items.len() > 1 {
        let ignored: Vec<String> = config_list
            .items
            .iter()
            .skip(1)
            .map(|c| format!("{}/{}", c.namespace().unwrap_or_default(), c.name_any()))
            .collect();
        warn!(
            "{}",
            SyncError::AmbiguousConfig(format!(
                "{} Config objects found, using the first and ignoring {}",
                config_list.items.len(),
                ignored.join(", ")
            ))
        );
    }

    if let Some(config) = config_list.items.into_iter().next() {
        let source = ConfigSource::Namespaced(config);
        debug!("Using {}", source.describe());
        return Ok(source);
    }

    let cluster_configs: Api<ClusterConfig> = Api::all(client.clone());
    let cluster_config_list = cluster_configs.list(&ListParams::default()).await?;

    if cluster_config_list.items.len() > 1 {
        warn!(
            "{}",
            SyncError::AmbiguousConfig(format!(
                "{} ClusterConfig objects found, using the first",
                cluster_config_list.items.len()
            ))
        );
    }

    match cluster_config_list.items.into_iter().next() {
        Some(cluster_config) => {
            let source = ConfigSource::ClusterWide(cluster_config);
            debug!("Using {}", source.describe());
            Ok(source)
        }
        None => Err(SyncError::NotFound(
            "no Config or ClusterConfig found in the cluster".to_string(),
        )),
    }
}

/// Resolve the effective configuration and collapse it into a Config
pub async fn resolve_effective_config(client: &Client) -> Result<Config> {
    Ok(resolve_config(client).await?.into_config())
}
