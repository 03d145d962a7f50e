// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Azure Key Vault certificate store over the REST API.

use crate::constants::vault::{API_VERSION, PEM_CONTENT_TYPE};
use crate::error::{Result, SyncError};
use crate::vault::credential::AzureCredential;
use crate::vault::{CertificateItem, CertificateStore};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificateListPage {
    #[serde(default)]
    value: Vec<CertificateListEntry>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct CertificateListEntry {
    id: String,
}

#[derive(Deserialize)]
struct KeyVaultErrorBody {
    error: KeyVaultErrorDetail,
}

#[derive(Deserialize)]
struct KeyVaultErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Extract the certificate name from an id like `https://v.vault.azure.net/certificates/{name}[/{version}]`
fn certificate_name_from_id(id: &str) -> Option<String> {
    let url = Url::parse(id).ok()?;
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "certificates" {
            return segments.next().filter(|s| !s.is_empty()).map(String::from);
        }
    }
    None
}

fn status_error(status: StatusCode, detail: String) -> SyncError {
    match status {
        StatusCode::NOT_FOUND => SyncError::CertificateNotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SyncError::CredentialError(format!("{}: {}", status, detail))
        }
        _ => SyncError::ConnectionError(format!("{}: {}", status, detail)),
    }
}

/// Certificate store backed by one Azure Key Vault
pub struct KeyVaultClient {
    vault_url: Url,
    http: reqwest::Client,
    credential: Arc<AzureCredential>,
}

impl KeyVaultClient {
    pub fn new(
        vault_url: &str,
        http: reqwest::Client,
        credential: Arc<AzureCredential>,
    ) -> Result<Self> {
        let mut vault_url = Url::parse(vault_url)
            .map_err(|e| SyncError::ConnectionError(format!("invalid vault URL {}: {}", vault_url, e)))?;
        if vault_url.scheme() != "https" && vault_url.scheme() != "http" {
            return Err(SyncError::ConnectionError(format!(
                "unsupported vault URL scheme: {}",
                vault_url.scheme()
            )));
        }
        if !vault_url.path().ends_with('/') {
            let path = format!("{}/", vault_url.path());
            vault_url.set_path(&path);
        }

        Ok(Self {
            vault_url,
            http,
            credential,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.vault_url
            .join(path)
            .map_err(|e| SyncError::ConnectionError(format!("invalid request path {}: {}", path, e)))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let token = self.credential.token().await?;
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<KeyVaultErrorBody>(&text)
            .map(|b| format!("{}: {}", b.error.code, b.error.message))
            .unwrap_or(text);

        Err(status_error(status, detail))
    }

    fn with_api_version(mut url: Url) -> Url {
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        url
    }
}

#[async_trait]
impl CertificateStore for KeyVaultClient {
    #[instrument(skip(self, combined_pem))]
    async fn import_certificate(&self, name: &str, combined_pem: &str) -> Result<()> {
        let url = Self::with_api_version(self.endpoint(&format!("certificates/{}/import", name))?);
        let body = serde_json::json!({
            "value": combined_pem,
            "policy": {
                "secret_props": { "contentType": PEM_CONTENT_TYPE }
            }
        });

        self.send(Method::POST, url, Some(body)).await?;
        debug!("Imported certificate {}", name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_certificates(&self) -> Result<Vec<CertificateItem>> {
        let mut certificates = Vec::new();
        let mut next = Some(Self::with_api_version(self.endpoint("certificates")?));

        while let Some(url) = next.take() {
            let page: CertificateListPage = self
                .send(Method::GET, url, None)
                .await?
                .json()
                .await
                .map_err(|e| SyncError::ConnectionError(format!("invalid certificate list: {}", e)))?;

            certificates.extend(page.value.into_iter().map(|entry| CertificateItem {
                name: certificate_name_from_id(&entry.id).unwrap_or(entry.id),
            }));

            next = match page.next_link.filter(|l| !l.is_empty()) {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    SyncError::ConnectionError(format!("invalid nextLink {}: {}", link, e))
                })?),
                None => None,
            };
        }

        Ok(certificates)
    }

    #[instrument(skip(self))]
    async fn delete_certificate(&self, name: &str) -> Result<()> {
        let url = Self::with_api_version(self.endpoint(&format!("certificates/{}", name))?);
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge_deleted_certificate(&self, name: &str) -> Result<()> {
        let url = Self::with_api_version(self.endpoint(&format!("deletedcertificates/{}", name))?);
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}
