// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, configuration lookup, finalizers, and status reporting.

pub mod crd;
pub mod finalizer;
pub mod resolver;
pub mod status;

pub use crd::wait_for_crds;
pub use finalizer::{add_finalizer, has_finalizer, is_deleting, remove_finalizer};
pub use resolver::{resolve_config, resolve_effective_config};
pub use status::record_status;
