// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret reconciler - keeps a SyncSecretAKV in step with every eligible TLS secret.

use crate::constants::{finalizers, TLS_SECRET_TYPE};
use crate::error::{Result, SyncError};
use crate::kubernetes::{
    add_finalizer, has_finalizer, is_deleting, remove_finalizer, resolve_effective_config,
};
use crate::reconcilers::{requeue_after, with_deadline, Context, ObjectKey};
use crate::sync::{check_secret, delete_tracking, upsert_tracking, UpsertOutcome};
use crate::types::SyncSecretAKV;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller::Action, Controller},
    Api,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct SecretReconciler {
    ctx: Arc<Context>,
}

impl SecretReconciler {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::all(self.ctx.client.clone());
        let watcher_config = WatcherConfig::default().fields(&format!("type={}", TLS_SECRET_TYPE));

        Controller::new(secrets, watcher_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled secret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;
        Ok(())
    }
}

async fn reconcile(secret: Arc<Secret>, ctx: Arc<Context>) -> Result<Action> {
    with_deadline(ctx.settings.reconcile_timeout, handle_secret(&secret, &ctx)).await
}

fn error_policy(_secret: Arc<Secret>, error: &SyncError, _ctx: Arc<Context>) -> Action {
    requeue_after(error)
}

/// Bring the tracking object for one secret in line with the secret's current state.
///
/// A tracked secret being deleted takes its tracking object with it before its finalizer is
/// released. An eligible secret gets the finalizer first, then a tracking object recording its
/// current resource version. Ineligible secrets are left alone.
#[instrument(skip_all, fields(secret = %ObjectKey::of(secret)))]
pub async fn handle_secret(secret: &Secret, ctx: &Context) -> Result<Action> {
    let key = ObjectKey::of(secret);
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &key.namespace);
    let tracking: Api<SyncSecretAKV> = Api::namespaced(ctx.client.clone(), &key.namespace);

    if is_deleting(secret) {
        if !has_finalizer(secret, finalizers::SECRET) {
            return Ok(Action::await_change());
        }
        if delete_tracking(&tracking, &key.name).await? {
            info!("Secret {} was deleted, removed its tracking object", key);
        } else {
            debug!("Secret {} was deleted and had no tracking object", key);
        }
        remove_finalizer(&secrets, secret, finalizers::SECRET).await?;
        return Ok(Action::await_change());
    }

    if !ctx.settings.namespace_allowed(&key.namespace) {
        debug!("Namespace {} is not watched, ignoring", key.namespace);
        return Ok(Action::await_change());
    }

    let config = resolve_effective_config(&ctx.client).await?;
    if let Err(reason) = check_secret(secret, &config.spec) {
        debug!("Skipping secret {}: {}", key, reason);
        return Ok(Action::await_change());
    }

    if !has_finalizer(secret, finalizers::SECRET) {
        // The finalizer write bumps the resource version; its event creates the tracking object
        add_finalizer(&secrets, secret, finalizers::SECRET).await?;
        return Ok(Action::await_change());
    }

    match upsert_tracking(&tracking, secret, &config.spec.vault_name()).await? {
        UpsertOutcome::Created => info!("Tracking new secret {}", key),
        UpsertOutcome::Advanced { previous } => {
            info!("Secret {} changed since version {}, scheduled for sync", key, previous)
        }
        UpsertOutcome::Unchanged => debug!("Secret {} already tracked at its current version", key),
    }

    Ok(Action::await_change())
}
