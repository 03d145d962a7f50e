// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! SyncSecretAKV lifecycle: create, advance, mark synced, delete

use crate::constants::OPERATOR_NAME;
use crate::error::{is_kube_conflict, is_kube_not_found, Result, SyncError};
use crate::types::SyncSecretAKV;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{DeleteParams, Patch, PatchParams, PostParams},
    Api, ResourceExt,
};
use tracing::{debug, instrument};

/// Attempts made when the tracking object is written concurrently
const MAX_WRITE_ATTEMPTS: usize = 3;

/// What an upsert did to the tracking object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Advanced { previous: String },
    Unchanged,
}

/// Make the tracking object for `secret` record the secret's current resource version.
///
/// Equal versions cause no write. Optimistic-concurrency conflicts are retried against a fresh
/// read, up to a bounded number of attempts.
#[instrument(skip(api, secret), fields(secret = %secret.name_any()))]
pub async fn upsert_tracking(
    api: &Api<SyncSecretAKV>,
    secret: &Secret,
    vault_name: &str,
) -> Result<UpsertOutcome> {
    let name = secret.name_any();
    let version = secret.resource_version().unwrap_or_default();

    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let write = match api.get_opt(&name).await? {
            None => api
                .create(&PostParams::default(), &SyncSecretAKV::for_secret(secret, vault_name))
                .await
                .map(|_| UpsertOutcome::Created),
            Some(existing) if existing.spec.secret_resource_version == version => {
                return Ok(UpsertOutcome::Unchanged);
            }
            Some(mut existing) => {
                let previous =
                    std::mem::replace(&mut existing.spec.secret_resource_version, version.clone());
                api.replace(&name, &PostParams::default(), &existing)
                    .await
                    .map(|_| UpsertOutcome::Advanced { previous })
            }
        };

        match write {
            Ok(outcome) => return Ok(outcome),
            Err(e) if is_kube_conflict(&e) => {
                debug!("Conflict writing tracking object {} (attempt {}), retrying", name, attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SyncError::ConflictError(format!(
        "tracking object {} still conflicting after {} attempts",
        name, MAX_WRITE_ATTEMPTS
    )))
}

/// Delete the tracking object if it exists. Returns whether anything was deleted.
#[instrument(skip(api))]
pub async fn delete_tracking(api: &Api<SyncSecretAKV>, name: &str) -> Result<bool> {
    if api.get_opt(name).await?.is_none() {
        return Ok(false);
    }

    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(true),
        Err(e) if is_kube_not_found(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Record that the vault now reflects `synced_version`
#[instrument(skip(api))]
pub async fn mark_synced(api: &Api<SyncSecretAKV>, name: &str, synced_version: &str) -> Result<()> {
    let patch = serde_json::json!({
        "spec": { "syncedResourceVersion": synced_version }
    });
    let pp = PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };
    api.patch(name, &pp, &Patch::Merge(&patch)).await?;
    Ok(())
}
