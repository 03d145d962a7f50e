// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Best-effort status reporting on custom resources

use crate::constants::OPERATOR_NAME;
use crate::types::SyncStatus;
use kube::api::{Patch, PatchParams};
use kube::Api;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, warn};

/// Merge-patch the status subresource of `name`.
///
/// Failures are logged and swallowed; status is informational and must never fail a pass.
pub async fn record_status<K>(api: &Api<K>, name: &str, status: SyncStatus)
where
    K: Clone + DeserializeOwned + Debug,
{
    let patch = serde_json::json!({ "status": status });
    let pp = PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };
    match api.patch_status(name, &pp, &Patch::Merge(&patch)).await {
        Ok(_) => debug!("Recorded status for {}: {:?}", name, status.state),
        Err(e) => warn!("Failed to record status for {}: {}", name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{server_error_json, tracking_json, MockService};
    use crate::types::SyncSecretAKV;

    const STATUS_PATH: &str =
        "/apis/api.syncsecretakv.io/v1alpha1/namespaces/vws/syncsecretakvs/app-tls/status";

    #[tokio::test]
    async fn test_record_status_sends_merge_patch() {
        let mock = MockService::new().on_patch(STATUS_PATH, 200, &tracking_json("vws", "app-tls", "v1", "v1"));
        let api: Api<SyncSecretAKV> = Api::namespaced(mock.client(), "vws");

        record_status(&api, "app-tls", SyncStatus::success("imported")).await;

        let requests = mock.requests_matching("PATCH", STATUS_PATH);
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["status"]["syncStatus"], "Success");
        assert_eq!(body["status"]["syncStatusMessage"], "imported");
    }

    #[tokio::test]
    async fn test_record_status_swallows_failures() {
        let mock = MockService::new().on_patch(STATUS_PATH, 500, &server_error_json());
        let api: Api<SyncSecretAKV> = Api::namespaced(mock.client(), "vws");

        record_status(&api, "app-tls", SyncStatus::failed("boom")).await;

        assert_eq!(mock.count("PATCH", STATUS_PATH), 1);
    }
}
