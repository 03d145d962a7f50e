// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Config and ClusterConfig reconcilers - check that the configured vault is reachable
//! and report the outcome on the resource status.

use crate::error::{Result, SyncError};
use crate::kubernetes::record_status;
use crate::reconcilers::{requeue_after, with_deadline, Context};
use crate::types::{ClusterConfig, Config, ConfigSpec, SyncStatus};
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, Controller},
    Api, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const VALIDATED_MESSAGE: &str = "Successfully listed certificates in the Azure Key Vault";

pub struct ConfigReconciler {
    ctx: Arc<Context>,
}

impl ConfigReconciler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let configs: Api<Config> = Api::all(self.ctx.client.clone());

        Controller::new(configs, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile_config, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled Config: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

pub struct ClusterConfigReconciler {
    ctx: Arc<Context>,
}

impl ClusterConfigReconciler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let cluster_configs: Api<ClusterConfig> = Api::all(self.ctx.client.clone());

        Controller::new(cluster_configs, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile_cluster_config, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled ClusterConfig: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile_config(config: Arc<Config>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = config.namespace().unwrap_or_default();
    let api: Api<Config> = Api::namespaced(ctx.client.clone(), &namespace);
    with_deadline(
        ctx.settings.reconcile_timeout,
        validate(&api, &config.name_any(), &config.spec, config.status.as_ref(), &ctx),
    )
    .await
}

async fn reconcile_cluster_config(
    cluster_config: Arc<ClusterConfig>,
    ctx: Arc<Context>,
) -> Result<Action> {
    let api: Api<ClusterConfig> = Api::all(ctx.client.clone());
    let spec: ConfigSpec = cluster_config.spec.clone().into();
    with_deadline(
        ctx.settings.reconcile_timeout,
        validate(&api, &cluster_config.name_any(), &spec, cluster_config.status.as_ref(), &ctx),
    )
    .await
}

fn error_policy<K>(_obj: Arc<K>, error: &SyncError, _ctx: Arc<Context>) -> Action {
    requeue_after(error)
}

/// List the vault's certificates and record whether that worked.
///
/// The status is only written when it changes, so a healthy configuration settles after one pass.
#[instrument(skip(api, spec, current, ctx), fields(vault = %spec.az_key_vault_url))]
pub async fn validate<K>(
    api: &Api<K>,
    name: &str,
    spec: &ConfigSpec,
    current: Option<&SyncStatus>,
    ctx: &Context,
) -> Result<Action>
where
    K: Clone + DeserializeOwned + Debug,
{
    let outcome = list_certificates(spec, ctx).await;

    let status = match &outcome {
        Ok(count) => {
            info!("Vault {} is reachable and holds {} certificates", spec.vault_name(), count);
            SyncStatus::success(VALIDATED_MESSAGE)
        }
        Err(e) => SyncStatus::failed(format!(
            "Failed to list certificates in the Azure Key Vault: {}",
            e
        )),
    };

    if current != Some(&status) {
        record_status(api, name, status).await;
    }

    outcome.map(|_| Action::await_change())
}

async fn list_certificates(spec: &ConfigSpec, ctx: &Context) -> Result<usize> {
    let store = ctx.stores.build(spec)?;
    let certificates = store.list_certificates().await?;
    let names: Vec<&str> = certificates.iter().map(|c| c.name.as_str()).collect();
    debug!("Certificates in {}: {:?}", spec.vault_name(), names);
    Ok(certificates.len())
}
