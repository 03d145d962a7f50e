// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! SyncSecretAKV reconciler - pushes tracked secrets into the vault and retires
//! certificates whose tracking object is being deleted.

use crate::constants::finalizers;
use crate::error::{Result, SyncError};
use crate::kubernetes::{
    add_finalizer, has_finalizer, is_deleting, record_status, remove_finalizer, resolve_effective_config,
};
use crate::reconcilers::{requeue_after, with_deadline, Context, ObjectKey};
use crate::sync::{mark_synced, tls_material};
use crate::types::{ConfigSpec, SyncSecretAKV, SyncStatus};
use crate::vault::{assemble_full_chain, to_store_encoding, CertificateStore};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller::Action, Controller},
    Api, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Purge attempts before a soft-deleted certificate is left for the vault's retention policy
const PURGE_ATTEMPTS: u32 = 3;

pub struct SyncSecretReconciler {
    ctx: Arc<Context>,
}

impl SyncSecretReconciler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let tracking: Api<SyncSecretAKV> = Api::all(self.ctx.client.clone());

        Controller::new(tracking, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled SyncSecretAKV: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;
        Ok(())
    }
}

async fn reconcile(tracking: Arc<SyncSecretAKV>, ctx: Arc<Context>) -> Result<Action> {
    with_deadline(ctx.settings.reconcile_timeout, handle_sync(&tracking, &ctx)).await
}

fn error_policy(_tracking: Arc<SyncSecretAKV>, error: &SyncError, _ctx: Arc<Context>) -> Action {
    requeue_after(error)
}

/// Make the vault reflect one tracking object.
///
/// A tracking object being deleted retires its certificate: the certificate is deleted and, when
/// the configuration allows it, purged after the grace period. Only then is the finalizer
/// released. A live tracking object whose observed version differs from its synced version
/// triggers an import; equal versions do nothing.
#[instrument(skip_all, fields(tracking = %ObjectKey::of(tracking)))]
pub async fn handle_sync(tracking: &SyncSecretAKV, ctx: &Context) -> Result<Action> {
    let namespace = tracking.namespace().unwrap_or_default();
    let name = tracking.name_any();
    let deleting = is_deleting(tracking);

    if deleting && !has_finalizer(tracking, finalizers::CERTIFICATE) {
        return Ok(Action::await_change());
    }
    if !deleting && !ctx.settings.namespace_allowed(&namespace) {
        debug!("Namespace {} is not watched, ignoring", namespace);
        return Ok(Action::await_change());
    }

    let config = resolve_effective_config(&ctx.client).await?;
    let api: Api<SyncSecretAKV> = Api::namespaced(ctx.client.clone(), &namespace);
    let certificate = tracking.certificate_name();

    if deleting {
        retire_certificate(&certificate, &config.spec, ctx).await?;
        remove_finalizer(&api, tracking, finalizers::CERTIFICATE).await?;
        return Ok(Action::await_change());
    }

    if !has_finalizer(tracking, finalizers::CERTIFICATE) {
        // The finalizer write produces a new event which carries on from here
        add_finalizer(&api, tracking, finalizers::CERTIFICATE).await?;
        return Ok(Action::await_change());
    }

    if tracking.is_synced() {
        debug!("Certificate {} is up to date", certificate);
        return Ok(Action::await_change());
    }

    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    let Some(secret) = secrets.get_opt(&tracking.spec.secret_name).await? else {
        debug!("Source secret of {}/{} is gone, waiting for tracking removal", namespace, name);
        return Ok(Action::await_change());
    };

    let target_version = tracking.spec.secret_resource_version.clone();

    match push_certificate(&secret, &certificate, &config.spec, ctx).await {
        Ok(()) => {
            mark_synced(&api, &name, &target_version).await?;
            info!("Imported certificate {} at secret version {}", certificate, target_version);
            record_status(
                &api,
                &name,
                SyncStatus::success(format!("Successfully imported certificate {}", certificate)),
            )
            .await;
            Ok(Action::await_change())
        }
        Err(e) => {
            record_status(
                &api,
                &name,
                SyncStatus::failed(format!("Failed to import certificate {}: {}", certificate, e)),
            )
            .await;
            Err(e)
        }
    }
}

async fn push_certificate(
    secret: &Secret,
    certificate: &str,
    spec: &ConfigSpec,
    ctx: &Context,
) -> Result<()> {
    let (cert, key) = tls_material(secret)?;
    let bundle = assemble_full_chain(&cert, &to_store_encoding(&key)?);
    let store = ctx.stores.build(spec)?;
    store.import_certificate(certificate, &bundle).await
}

/// Delete a certificate and schedule its purge when the configuration allows it.
///
/// An already absent certificate still gets its purge scheduled, since a previous pass may
/// have failed between the two steps.
async fn retire_certificate(
    certificate: &str,
    spec: &ConfigSpec,
    ctx: &Context,
) -> Result<Option<JoinHandle<()>>> {
    let store = ctx.stores.build(spec)?;

    match store.delete_certificate(certificate).await {
        Ok(()) => info!("Deleted certificate {} from {}", certificate, spec.vault_name()),
        Err(e) if e.is_missing_certificate() => debug!("Certificate {} already deleted", certificate),
        Err(e) => return Err(e),
    }

    if !spec.allow_az_key_vault_certificate_deletion {
        debug!("Purging disabled, leaving {} soft-deleted", certificate);
        return Ok(None);
    }

    Ok(Some(schedule_purge(
        store,
        certificate.to_string(),
        ctx.settings.purge_grace_period,
        ctx.shutdown.clone(),
    )))
}

/// Purge a soft-deleted certificate once `grace` has elapsed, unless `shutdown` fires first
pub fn schedule_purge(
    store: Arc<dyn CertificateStore>,
    certificate: String,
    grace: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for attempt in 1..=PURGE_ATTEMPTS {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown before purge of {}", certificate);
                    return;
                }
                _ = tokio::time::sleep(grace) => {}
            }

            match store.purge_deleted_certificate(&certificate).await {
                Ok(()) => {
                    info!("Purged certificate {}", certificate);
                    return;
                }
                Err(e) if e.is_missing_certificate() => {
                    debug!("Certificate {} was already purged", certificate);
                    return;
                }
                Err(e) => warn!("Purge of {} failed (attempt {}): {}", certificate, attempt, e),
            }
        }
    })
}
