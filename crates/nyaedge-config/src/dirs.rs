//! Data directory initialization.
//!
//! Ensures the data directory exists with its `state/` and `logs/`
//! subdirectories and a commented default `config.toml`. Called once
//! during control plane startup.

use std::path::{Path, PathBuf};

/// Default content for a freshly created config.toml.
pub const DEFAULT_CONFIG_TOML: &str = "\
# nyaedge-center configuration

[server]
# address = \"0.0.0.0\"
# port = 8080

[storage]
# path = \"/var/lib/nyaedge/nodes.json\"

[activation]
# ping_timeout_secs = 5

[tokens]
# signing_key_path = \"/var/lib/nyaedge/signing.key\"
";

pub const CONFIG_FILENAME: &str = "config.toml";

/// Path of the config file inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILENAME)
}

/// Ensure the data directory structure exists.
///
/// Creates `data_dir/`, `data_dir/state/`, `data_dir/logs/` and a default
/// `config.toml` when absent. Failures are logged, not fatal: the control
/// plane surfaces a storage error later if it really cannot write.
pub fn ensure_data_dir(data_dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(data_dir) {
        tracing::warn!(
            path = %data_dir.display(),
            error = %e,
            "Could not create data directory"
        );
        return;
    }

    for subdir in &["state", "logs"] {
        let path = data_dir.join(subdir);
        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not create subdirectory"
            );
        }
    }

    let config_path = config_path(data_dir);
    if !config_path.exists() {
        match std::fs::write(&config_path, DEFAULT_CONFIG_TOML) {
            Ok(()) => tracing::info!(path = %config_path.display(), "Created default config"),
            Err(e) => tracing::warn!(
                path = %config_path.display(),
                error = %e,
                "Could not write default config"
            ),
        }
    }

    tracing::debug!(path = %data_dir.display(), "Data directory ready");
}
