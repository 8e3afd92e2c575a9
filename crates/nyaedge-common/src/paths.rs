use std::path::PathBuf;

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "NYAEDGE_DATA_DIR";

/// Root data directory for nyaedge.
///
/// - `$NYAEDGE_DATA_DIR` if set
/// - Linux: `~/.nyaedge/`
/// - macOS: `~/Library/Application Support/nyaedge/`
/// - Windows: `%LOCALAPPDATA%\nyaedge\`
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("nyaedge");
        }
    }

    #[cfg(windows)]
    {
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(local).join("nyaedge");
        }
    }

    #[cfg(not(any(target_os = "macos", windows)))]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".nyaedge");
        }
    }

    // Fallback
    PathBuf::from(".nyaedge")
}

/// Persistent state (node registry, signing key).
pub fn state_dir() -> PathBuf {
    data_dir().join("state")
}

/// Log directory (audit log, optional file logs).
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}
