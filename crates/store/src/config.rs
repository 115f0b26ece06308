use std::path::PathBuf;
use std::sync::OnceLock;

static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Sets the directory journals are created in.
///
/// # Logic
/// 1. Stores the path in a process-wide cell.
/// 2. Later calls are ignored once a root is set.
///
/// # Returns
/// `false` when a root directory was already configured.
pub fn set_root_dir(path: PathBuf) -> bool {
    ROOT_DIR.set(path).is_ok()
}

/// Configured root directory, `data` when unset.
pub(crate) fn get_root_dir() -> PathBuf {
    ROOT_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"))
}
