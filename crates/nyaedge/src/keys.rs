//! Signing key bootstrap.
//!
//! Resolution order: `NYAEDGE_SIGNING_KEY` (hex), then the key file,
//! then a freshly generated key persisted to the key file.

use std::path::Path;

use anyhow::Context;
use nyaedge_common::persist;
use nyaedge_crypto::token::SigningKey;

pub const SIGNING_KEY_ENV: &str = "NYAEDGE_SIGNING_KEY";

pub fn load_or_generate(path: &Path) -> anyhow::Result<SigningKey> {
    if let Ok(hex) = std::env::var(SIGNING_KEY_ENV) {
        tracing::info!("Signing key: from {SIGNING_KEY_ENV}");
        return SigningKey::from_hex(hex.trim())
            .with_context(|| format!("{SIGNING_KEY_ENV} is not a usable signing key"));
    }
    load_or_generate_file(path)
}

pub(crate) fn load_or_generate_file(path: &Path) -> anyhow::Result<SigningKey> {
    if path.exists() {
        let hex = std::fs::read_to_string(path)
            .with_context(|| format!("reading signing key {}", path.display()))?;
        let key = SigningKey::from_hex(hex.trim())
            .with_context(|| format!("signing key {} is corrupt", path.display()))?;
        tracing::info!(path = %path.display(), "Signing key: loaded");
        return Ok(key);
    }

    let key = SigningKey::generate();
    persist::write_private(path, key.to_hex().as_bytes())
        .with_context(|| format!("writing signing key {}", path.display()))?;
    tracing::info!(path = %path.display(), "Signing key: generated");
    Ok(key)
}
