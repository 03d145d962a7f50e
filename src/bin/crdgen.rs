// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResourceExt;
use syncsecretakv::types::{ClusterConfig, Config, SyncSecretAKV};

/// Print the operator's CustomResourceDefinitions as a multi-document YAML stream
fn main() -> anyhow::Result<()> {
    for crd in [Config::crd(), ClusterConfig::crd(), SyncSecretAKV::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
