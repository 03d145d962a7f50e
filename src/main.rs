// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use syncsecretakv::config::Settings;
use syncsecretakv::kubernetes::wait_for_crds;
use syncsecretakv::reconcilers::{
    ClusterConfigReconciler, ConfigReconciler, Context, SecretReconciler, SyncSecretReconciler,
};
use syncsecretakv::vault::KeyVaultFactory;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting syncsecretakv operator");

    let settings = Settings::from_env()?;
    info!(
        "Configuration loaded: watch_namespaces={:?} purge_grace_period={:?} reconcile_timeout={:?}",
        settings.watch_namespaces, settings.purge_grace_period, settings.reconcile_timeout
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for syncsecretakv CRDs to become available...");
    wait_for_crds(&client).await?;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(Context {
        client,
        stores: Arc::new(KeyVaultFactory::new(settings.ambient_credentials.clone())),
        settings,
        shutdown: shutdown.clone(),
    });

    info!("Starting reconcilers...");

    let result = tokio::try_join!(
        SecretReconciler::new(ctx.clone()).run(),
        SyncSecretReconciler::new(ctx.clone()).run(),
        ConfigReconciler::new(ctx.clone()).run(),
        ClusterConfigReconciler::new(ctx).run()
    );

    // Controllers stop on SIGTERM or Ctrl-C; pending purges must not outlive them
    shutdown.cancel();
    result?;

    info!("Reconcilers stopped, pending purges cancelled");
    Ok(())
}
