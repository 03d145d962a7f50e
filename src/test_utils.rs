// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and the certificate vault.

use crate::config::Settings;
use crate::constants::finalizers;
use crate::error::{Result, SyncError};
use crate::reconcilers::Context;
use crate::types::ConfigSpec;
use crate::vault::{CertificateItem, CertificateStore, CertificateStoreFactory};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::chrono::Utc;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, Resource};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::Poll;
use tokio_util::sync::CancellationToken;
use tower::Service;

pub const CONFIGS_PATH: &str = "/apis/api.syncsecretakv.io/v1alpha1/configs";
pub const CLUSTER_CONFIGS_PATH: &str = "/apis/api.syncsecretakv.io/v1alpha1/clusterconfigs";
pub const TRACKING_PATH: &str = "/apis/api.syncsecretakv.io/v1alpha1/namespaces/vws/syncsecretakvs";
pub const TRACKING_ITEM_PATH: &str =
    "/apis/api.syncsecretakv.io/v1alpha1/namespaces/vws/syncsecretakvs/app-tls";
pub const TRACKING_STATUS_PATH: &str =
    "/apis/api.syncsecretakv.io/v1alpha1/namespaces/vws/syncsecretakvs/app-tls/status";
pub const SECRET_PATH: &str = "/api/v1/namespaces/vws/secrets/app-tls";

/// A request seen by the mock API server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
///
/// Responses registered for the same route are served in order and the last one repeats.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), VecDeque<(u16, String)>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for requests with this method matching the path
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client backed by this mock. The mock keeps recording after the call.
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_matching(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests_matching(method, path).len()
    }

    /// Every request that is not a read
    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();

        let exact = (method.to_string(), path.to_string());
        let route = if responses.contains_key(&exact) {
            exact
        } else {
            // Longest registered prefix wins, e.g. an item path also answers its /status subresource
            responses
                .keys()
                .filter(|(m, p)| m == method && path.starts_with(p.as_str()))
                .max_by_key(|(_, p)| p.len())
                .cloned()?
        };

        let queue = responses.get_mut(&route)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body: Bytes = req
                .into_body()
                .collect()
                .await
                .map(|c| c.to_bytes())
                .unwrap_or_default();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.clone(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });

            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a 409 optimistic-concurrency conflict response
pub fn conflict_json(name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("Operation cannot be fulfilled on \"{}\": the object has been modified", name),
        "reason": "Conflict",
        "code": 409
    })
    .to_string()
}

/// Create a 500 internal error response
pub fn server_error_json() -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": "etcdserver: request timed out",
        "reason": "InternalError",
        "code": 500
    })
    .to_string()
}

/// Create a list response wrapping already-serialized items
pub fn list_json(kind: &str, items: Vec<String>) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|i| serde_json::from_str(i).unwrap())
        .collect();
    serde_json::json!({
        "apiVersion": "api.syncsecretakv.io/v1alpha1",
        "kind": kind,
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a Config with an arbitrary spec
pub fn config_json_with(namespace: &str, name: &str, spec: serde_json::Value) -> String {
    serde_json::json!({
        "apiVersion": "api.syncsecretakv.io/v1alpha1",
        "kind": "Config",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "1"
        },
        "spec": spec
    })
    .to_string()
}

/// Create a Config pointing at a vault without filters or credentials
pub fn config_json(namespace: &str, name: &str, vault_url: &str) -> String {
    config_json_with(namespace, name, serde_json::json!({ "azKeyVaultURL": vault_url }))
}

/// Create a ClusterConfig pointing at a vault without filters or credentials
pub fn cluster_config_json(name: &str, vault_url: &str) -> String {
    serde_json::json!({
        "apiVersion": "api.syncsecretakv.io/v1alpha1",
        "kind": "ClusterConfig",
        "metadata": {
            "name": name,
            "resourceVersion": "1"
        },
        "spec": { "azKeyVaultURL": vault_url }
    })
    .to_string()
}

/// Create a SyncSecretAKV tracking object for vault `certs`, guarded by the certificate finalizer
pub fn tracking_json(namespace: &str, name: &str, secret_version: &str, synced_version: &str) -> String {
    serde_json::json!({
        "apiVersion": "api.syncsecretakv.io/v1alpha1",
        "kind": "SyncSecretAKV",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "7",
            "finalizers": [finalizers::CERTIFICATE]
        },
        "spec": {
            "vaultName": "certs",
            "secretName": name,
            "secretResourceVersion": secret_version,
            "syncedResourceVersion": synced_version
        }
    })
    .to_string()
}

/// Create a secret of any type with the given string data
pub fn secret_json_with(
    namespace: &str,
    name: &str,
    version: &str,
    type_: &str,
    labels: Option<&[(&str, &str)]>,
    data: &[(&str, &str)],
) -> String {
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some(version.to_string()),
            labels: labels.map(|l| {
                l.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
            ..Default::default()
        },
        type_: Some(type_.to_string()),
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    };
    serde_json::to_string(&secret).unwrap()
}

/// Create a `kubernetes.io/tls` secret with placeholder material
pub fn secret_json(namespace: &str, name: &str, version: &str, labels: Option<&[(&str, &str)]>) -> String {
    secret_json_with(
        namespace,
        name,
        version,
        "kubernetes.io/tls",
        labels,
        &[("tls.crt", "CERT"), ("tls.key", "KEY")],
    )
}

/// Parse a JSON object built by the helpers above
pub fn parse<K: serde::de::DeserializeOwned>(json: &str) -> K {
    serde_json::from_str(json).unwrap()
}

/// Mark an object as deleted, leaving it alive only through its finalizers
pub fn deleted<K: Resource>(mut obj: K) -> K {
    obj.meta_mut().deletion_timestamp = Some(Time(Utc::now()));
    obj
}

/// Add a finalizer to an object
pub fn with_finalizer<K: Resource>(mut obj: K, finalizer: &str) -> K {
    obj.meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    obj
}

/// A call made against the fake vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultCall {
    Import { name: String, bundle: String },
    List,
    Delete(String),
    Purge(String),
}

/// In-memory certificate store that records every call
#[derive(Default)]
pub struct FakeCertificateStore {
    calls: Mutex<Vec<VaultCall>>,
    certificates: Mutex<Vec<String>>,
    import_error: Option<String>,
    list_error: Option<String>,
}

impl FakeCertificateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_certificates(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            certificates: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            ..Default::default()
        })
    }

    pub fn failing_import(message: &str) -> Arc<Self> {
        Arc::new(Self {
            import_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn failing_list(message: &str) -> Arc<Self> {
        Arc::new(Self {
            list_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<VaultCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: VaultCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CertificateStore for FakeCertificateStore {
    async fn import_certificate(&self, name: &str, combined_pem: &str) -> Result<()> {
        self.record(VaultCall::Import {
            name: name.to_string(),
            bundle: combined_pem.to_string(),
        });
        if let Some(message) = &self.import_error {
            return Err(SyncError::ConnectionError(message.clone()));
        }
        let mut certificates = self.certificates.lock().unwrap();
        if !certificates.iter().any(|c| c == name) {
            certificates.push(name.to_string());
        }
        Ok(())
    }

    async fn list_certificates(&self) -> Result<Vec<CertificateItem>> {
        self.record(VaultCall::List);
        if let Some(message) = &self.list_error {
            return Err(SyncError::ConnectionError(message.clone()));
        }
        Ok(self
            .certificates
            .lock()
            .unwrap()
            .iter()
            .map(|name| CertificateItem { name: name.clone() })
            .collect())
    }

    async fn delete_certificate(&self, name: &str) -> Result<()> {
        self.record(VaultCall::Delete(name.to_string()));
        let mut certificates = self.certificates.lock().unwrap();
        match certificates.iter().position(|c| c == name) {
            Some(index) => {
                certificates.remove(index);
                Ok(())
            }
            None => Err(SyncError::CertificateNotFound(format!("certificate {} not found", name))),
        }
    }

    async fn purge_deleted_certificate(&self, name: &str) -> Result<()> {
        self.record(VaultCall::Purge(name.to_string()));
        Ok(())
    }
}

/// Factory handing out one shared fake store and remembering the configs it was built for
pub struct FakeStoreFactory {
    pub store: Arc<FakeCertificateStore>,
    built: Mutex<Vec<ConfigSpec>>,
}

impl FakeStoreFactory {
    pub fn new(store: Arc<FakeCertificateStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            built: Mutex::new(Vec::new()),
        })
    }

    pub fn built(&self) -> Vec<ConfigSpec> {
        self.built.lock().unwrap().clone()
    }
}

impl CertificateStoreFactory for FakeStoreFactory {
    fn build(&self, spec: &ConfigSpec) -> Result<Arc<dyn CertificateStore>> {
        self.built.lock().unwrap().push(spec.clone());
        Ok(self.store.clone())
    }
}

/// Build a reconciler context around a mock API server and a fake vault
pub fn test_context(mock: &MockService, factory: Arc<FakeStoreFactory>, settings: Settings) -> Arc<Context> {
    Arc::new(Context {
        client: mock.client(),
        settings,
        stores: factory,
        shutdown: CancellationToken::new(),
    })
}
