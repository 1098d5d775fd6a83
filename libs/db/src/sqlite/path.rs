//! SQLite path preparation utilities.

use std::io;

use super::dsn::sqlite_file_path;

/// Ensure the parent directory of a file-backed SQLite database exists.
/// Memory databases and URI-style DSNs are left alone.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> io::Result<()> {
    if !create_dirs {
        return Ok(());
    }

    if let Some(parent) = sqlite_file_path(dsn).as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}
