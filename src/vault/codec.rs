// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Conversion of TLS secret material into the PEM bundle Key Vault imports.

use crate::error::{Result, SyncError};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;

const RSA_PRIVATE_KEY_TAG: &str = "RSA PRIVATE KEY";

/// Re-encode a PKCS#1 `RSA PRIVATE KEY` PEM block as a PKCS#8 `PRIVATE KEY` PEM block
pub fn to_store_encoding(private_key_pem: &str) -> Result<String> {
    let block = pem::parse(private_key_pem.as_bytes())
        .map_err(|e| SyncError::CodecError(format!("failed to decode PEM block: {}", e)))?;

    if block.tag() != RSA_PRIVATE_KEY_TAG {
        return Err(SyncError::CodecError(format!(
            "expected PEM block '{}', found '{}'",
            RSA_PRIVATE_KEY_TAG,
            block.tag()
        )));
    }

    let key = RsaPrivateKey::from_pkcs1_der(block.contents())
        .map_err(|e| SyncError::CodecError(format!("failed to parse RSA private key: {}", e)))?;

    let pkcs8 = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| SyncError::CodecError(format!("failed to encode PKCS#8 key: {}", e)))?;

    Ok(pkcs8.to_string())
}

/// Combine certificate and key into the bundle accepted by the import API, certificate first
pub fn assemble_full_chain(public_cert_pem: &str, encoded_private_key_pem: &str) -> String {
    format!("{}\n{}", public_cert_pem, encoded_private_key_pem)
}
