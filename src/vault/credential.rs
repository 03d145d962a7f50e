// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Credential mode selection and access-token acquisition for Key Vault.

use crate::config::AmbientCredentials;
use crate::constants::vault::{DEFAULT_AUTHORITY_HOST, IMDS_TOKEN_ENDPOINT, RESOURCE, SCOPE};
use crate::error::{Result, SyncError};
use crate::types::ConfigSpec;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(120);

/// How the operator authenticates against Key Vault for one Config
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum CredentialMode {
    /// Service principal with an explicit client secret
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// User-assigned managed identity
    ManagedIdentity { client_id: String },
    /// Ambient chain: environment service principal, workload identity, system-assigned identity
    Default,
}

impl fmt::Debug for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialMode::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            CredentialMode::ManagedIdentity { client_id } => f
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .finish(),
            CredentialMode::Default => f.write_str("Default"),
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

impl CredentialMode {
    /// Pick the credential mode for a Config.
    ///
    /// An explicit secret wins over an explicit identity, which wins over ambient discovery.
    pub fn select(spec: &ConfigSpec) -> Self {
        let tenant_id = present(&spec.az_key_vault_tenant_id);
        let client_id = present(&spec.az_key_vault_client_id);
        let client_secret = present(&spec.az_key_vault_client_secret);

        match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => CredentialMode::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            },
            (_, Some(client_id), _) => CredentialMode::ManagedIdentity { client_id },
            _ => CredentialMode::Default,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialMode::ClientSecret { .. } => "client-secret",
            CredentialMode::ManagedIdentity { .. } => "managed-identity",
            CredentialMode::Default => "default",
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// AAD returns a number, IMDS returns a string
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        Duration::from_secs(secs.unwrap_or(300))
    }
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Bearer-token source for one credential mode
pub struct AzureCredential {
    mode: CredentialMode,
    ambient: AmbientCredentials,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AzureCredential {
    pub fn new(mode: CredentialMode, ambient: AmbientCredentials, http: reqwest::Client) -> Self {
        Self {
            mode,
            ambient,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, requesting a new one when the cached token is close to expiry
    #[instrument(skip(self), fields(mode = self.mode.kind()))]
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref() {
            if Instant::now() < c.refresh_at {
                return Ok(c.token.clone());
            }
        }

        let response = self.request_token().await?;
        let lifetime = response.lifetime().saturating_sub(EXPIRY_MARGIN);
        debug!("Obtained Key Vault token valid for {:?}", lifetime);

        let token = response.access_token;
        *cached = Some(CachedToken {
            token: token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        match &self.mode {
            CredentialMode::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => self.client_secret_token(tenant_id, client_id, client_secret).await,
            CredentialMode::ManagedIdentity { client_id } => {
                self.managed_identity_token(Some(client_id)).await
            }
            CredentialMode::Default => self.ambient_token().await,
        }
    }

    async fn ambient_token(&self) -> Result<TokenResponse> {
        let ambient = &self.ambient;
        let mut failures = Vec::new();

        if let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (&ambient.tenant_id, &ambient.client_id, &ambient.client_secret)
        {
            match self.client_secret_token(tenant_id, client_id, client_secret).await {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(format!("environment: {}", e)),
            }
        }

        if let (Some(tenant_id), Some(client_id), Some(token_file)) =
            (&ambient.tenant_id, &ambient.client_id, &ambient.federated_token_file)
        {
            match self.workload_identity_token(tenant_id, client_id, token_file).await {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(format!("workload identity: {}", e)),
            }
        }

        match self.managed_identity_token(None).await {
            Ok(token) => Ok(token),
            Err(e) => {
                failures.push(format!("managed identity: {}", e));
                Err(SyncError::CredentialError(format!(
                    "no ambient credential succeeded ({})",
                    failures.join("; ")
                )))
            }
        }
    }

    fn token_endpoint(&self, tenant_id: &str) -> String {
        let authority = self
            .ambient
            .authority_host
            .as_deref()
            .unwrap_or(DEFAULT_AUTHORITY_HOST)
            .trim_end_matches('/');
        format!("{}/{}/oauth2/v2.0/token", authority, tenant_id)
    }

    async fn client_secret_token(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", SCOPE),
        ];
        let request = self.http.post(self.token_endpoint(tenant_id)).form(&form);
        send_token_request(request).await
    }

    async fn workload_identity_token(
        &self,
        tenant_id: &str,
        client_id: &str,
        token_file: &str,
    ) -> Result<TokenResponse> {
        let assertion = tokio::fs::read_to_string(token_file).await.map_err(|e| {
            SyncError::CredentialError(format!("failed to read federated token {}: {}", token_file, e))
        })?;

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.trim()),
            ("scope", SCOPE),
        ];
        let request = self.http.post(self.token_endpoint(tenant_id)).form(&form);
        send_token_request(request).await
    }

    async fn managed_identity_token(&self, client_id: Option<&str>) -> Result<TokenResponse> {
        let mut query = vec![("api-version", "2018-02-01"), ("resource", RESOURCE)];
        if let Some(client_id) = client_id {
            query.push(("client_id", client_id));
        }

        let request = self
            .http
            .get(IMDS_TOKEN_ENDPOINT)
            .header("Metadata", "true")
            .query(&query);
        send_token_request(request).await
    }
}

async fn send_token_request(request: reqwest::RequestBuilder) -> Result<TokenResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| SyncError::CredentialError(format!("token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::CredentialError(format!(
            "token endpoint returned {}: {}",
            status, body
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| SyncError::CredentialError(format!("invalid token response: {}", e)))
}
