// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Finalizer bookkeeping on watched objects

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use kube::api::{Patch, PatchParams};
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Check if an object carries the given finalizer
pub fn has_finalizer<K: Resource>(obj: &K, finalizer: &str) -> bool {
    obj.finalizers().iter().any(|f| f == finalizer)
}

/// Check if an object has been deleted and only waits for its finalizers
pub fn is_deleting<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

/// Add `finalizer` to the object. The write is conditional on the object's resource version.
pub async fn add_finalizer<K>(api: &Api<K>, obj: &K, finalizer: &str) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    if has_finalizer(obj, finalizer) {
        return Ok(());
    }

    let mut finalizers = obj.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    write_finalizers(api, obj, finalizers).await?;
    debug!("Added finalizer {} to {}", finalizer, obj.name_any());
    Ok(())
}

/// Remove `finalizer` from the object, letting a pending deletion complete
pub async fn remove_finalizer<K>(api: &Api<K>, obj: &K, finalizer: &str) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    if !has_finalizer(obj, finalizer) {
        return Ok(());
    }

    let finalizers: Vec<String> = obj
        .finalizers()
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    write_finalizers(api, obj, finalizers).await?;
    debug!("Removed finalizer {} from {}", finalizer, obj.name_any());
    Ok(())
}

async fn write_finalizers<K>(api: &Api<K>, obj: &K, finalizers: Vec<String>) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let mut metadata = serde_json::json!({ "finalizers": finalizers });
    if let Some(version) = obj.resource_version() {
        metadata["resourceVersion"] = serde_json::Value::String(version);
    }
    let patch = serde_json::json!({ "metadata": metadata });

    let pp = PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };
    api.patch(&obj.name_any(), &pp, &Patch::Merge(&patch)).await?;
    Ok(())
}
