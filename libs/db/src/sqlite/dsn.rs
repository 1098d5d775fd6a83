//! SQLite DSN parsing and cleaning utilities.

use std::collections::HashMap;
use std::path::PathBuf;

/// Query parameters consumed by us and never forwarded to sqlx.
const SQLITE_PRAGMA_PARAMS: &[&str] = &["wal", "synchronous", "busy_timeout", "journal_mode"];

/// Split a SQLite DSN into the part sqlx understands and the PRAGMA
/// parameters we apply ourselves (lowercased keys).
///
/// The DSN is handled textually: `sqlite://relative/file.db` is a relative
/// path for sqlx, which a URL parser would read as host + path.
pub(crate) fn extract_sqlite_pragmas(dsn: &str) -> (String, HashMap<String, String>) {
    let Some((base, query)) = dsn.split_once('?') else {
        return (dsn.to_string(), HashMap::new());
    };

    let mut pragmas = HashMap::new();
    let mut remaining = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let key_lower = key.to_lowercase();
        if SQLITE_PRAGMA_PARAMS.contains(&key_lower.as_str()) {
            pragmas.insert(key_lower, value.into_owned());
        } else {
            remaining.push(format!("{key}={value}"));
        }
    }

    let clean = if remaining.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", remaining.join("&"))
    };

    (clean, pragmas)
}

/// `sqlite::memory:`, `sqlite://memory:` or any DSN with `mode=memory`.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    let (base, query) = dsn.split_once('?').unwrap_or((dsn, ""));
    if matches!(base, "sqlite::memory:" | "sqlite://memory:" | "sqlite://:memory:") {
        return true;
    }

    url::form_urlencoded::parse(query.as_bytes())
        .any(|(k, v)| k.eq_ignore_ascii_case("mode") && v.eq_ignore_ascii_case("memory"))
}

/// Filesystem path of a file-backed SQLite DSN, as sqlx will interpret it.
pub(crate) fn sqlite_file_path(dsn: &str) -> Option<PathBuf> {
    if is_memory_dsn(dsn) {
        return None;
    }

    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() || path.starts_with("file:") {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
