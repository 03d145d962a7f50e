// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod config;
pub mod secret;
pub mod sync_secret;

pub use config::{ClusterConfigReconciler, ConfigReconciler};
pub use secret::SecretReconciler;
pub use sync_secret::SyncSecretReconciler;

use crate::config::Settings;
use crate::constants::requeue;
use crate::error::{Result, SyncError};
use crate::vault::CertificateStoreFactory;
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Shared state handed to every reconciler
pub struct Context {
    pub client: Client,
    pub settings: Settings,
    pub stores: Arc<dyn CertificateStoreFactory>,
    /// Cancelled once the controllers have stopped; pending purges observe it
    pub shutdown: CancellationToken,
}

/// Namespace and name of a watched object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Run one reconciliation pass under a deadline
pub async fn with_deadline<F, T>(deadline: Duration, pass: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(deadline, pass)
        .await
        .map_err(|_| SyncError::Timeout(deadline))?
}

/// Requeue policy shared by all controllers.
///
/// A missing Config is an expected state, so it is retried slowly and quietly.
pub fn requeue_after(error: &SyncError) -> Action {
    if error.is_not_found() {
        debug!("Waiting for configuration: {}", error);
        Action::requeue(Duration::from_secs(requeue::NO_CONFIG_SECS))
    } else {
        error!("Reconciliation error: {}", error);
        Action::requeue(Duration::from_secs(requeue::ERROR_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::secret_json;
    use k8s_openapi::api::core::v1::Secret;

    #[test]
    fn test_object_key_display() {
        let secret: Secret = serde_json::from_str(&secret_json("vws", "app-tls", "v1", None)).unwrap();
        assert_eq!(ObjectKey::of(&secret).to_string(), "vws/app-tls");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_is_timeout() {
        let result: Result<()> = with_deadline(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(SyncError::Timeout(d)) if d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let result = with_deadline(Duration::from_secs(5), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_missing_config_requeues_slowly() {
        let not_found = SyncError::NotFound("no Config".to_string());
        let failure = SyncError::ConnectionError("refused".to_string());

        assert_eq!(
            requeue_after(&not_found),
            Action::requeue(Duration::from_secs(requeue::NO_CONFIG_SECS))
        );
        assert_eq!(
            requeue_after(&failure),
            Action::requeue(Duration::from_secs(requeue::ERROR_SECS))
        );
    }

    #[test]
    fn test_missing_vault_certificate_requeues_as_failure() {
        let missing = SyncError::CertificateNotFound("vws-app-tls".to_string());

        assert_eq!(
            requeue_after(&missing),
            Action::requeue(Duration::from_secs(requeue::ERROR_SECS))
        );
    }
}
