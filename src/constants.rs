// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// API group and version of the syncsecretakv custom resources
pub const API_GROUP: &str = "api.syncsecretakv.io";
pub const API_VERSION: &str = "v1alpha1";

/// The operator name used as field manager for patches
pub const OPERATOR_NAME: &str = "syncsecretakv";

/// Secret type handled by the operator
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Well-known data keys of a `kubernetes.io/tls` secret
pub mod secret_keys {
    /// Public certificate (chain) in PEM format
    pub const TLS_CERT: &str = "tls.crt";
    /// RSA private key in PEM format
    pub const TLS_KEY: &str = "tls.key";
}

/// Finalizers that hold deleted objects until their cleanup has run
pub mod finalizers {
    /// On tracked secrets: the tracking object is removed before the secret goes
    pub const SECRET: &str = "api.syncsecretakv.io/tracking";
    /// On tracking objects: the vault certificate is retired before the tracking object goes
    pub const CERTIFICATE: &str = "api.syncsecretakv.io/certificate";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRDs
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Requeue intervals used by the error policies
pub mod requeue {
    /// Retry delay after a failed reconciliation pass
    pub const ERROR_SECS: u64 = 60;
    /// Retry delay when no Config or ClusterConfig exists yet
    pub const NO_CONFIG_SECS: u64 = 300;
}

/// Azure Key Vault endpoints and defaults
pub mod vault {
    /// Key Vault REST API version
    pub const API_VERSION: &str = "7.4";
    /// OAuth2 scope for Key Vault data-plane tokens
    pub const SCOPE: &str = "https://vault.azure.net/.default";
    /// Resource identifier used by the instance metadata service
    pub const RESOURCE: &str = "https://vault.azure.net";
    /// Default Microsoft Entra authority
    pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
    /// Instance metadata service token endpoint
    pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
    /// Content type of imported PEM bundles
    pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";
    /// Seconds to wait between delete and purge of a certificate
    pub const DEFAULT_PURGE_GRACE_SECS: u64 = 30;
}
