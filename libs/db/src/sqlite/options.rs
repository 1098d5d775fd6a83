//! Typed SQLite connection options built from a DSN.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};

use super::dsn::{extract_sqlite_pragmas, is_memory_dsn};
use crate::{DbError, Result};

/// Parse the DSN into sqlx options and apply PRAGMAs.
///
/// File databases default to WAL + synchronous NORMAL + `default_busy_timeout`;
/// DSN query parameters (`journal_mode`, `wal`, `synchronous`, `busy_timeout`)
/// override the defaults. In-memory databases keep sqlx's journal defaults.
pub(crate) fn build_connect_options(
    dsn: &str,
    default_busy_timeout: Duration,
) -> Result<SqliteConnectOptions> {
    let (clean_dsn, pairs) = extract_sqlite_pragmas(dsn);
    let memory = is_memory_dsn(&clean_dsn);

    let mut opts = SqliteConnectOptions::from_str(&clean_dsn)?.create_if_missing(true);

    let busy_timeout = match pairs.get("busy_timeout") {
        Some(raw) => Duration::from_millis(parse_pragma::<u64>("busy_timeout", raw)?),
        None => default_busy_timeout,
    };
    opts = opts.busy_timeout(busy_timeout);

    if let Some(mode) = journal_mode(&pairs)? {
        opts = opts.journal_mode(mode);
    } else if !memory {
        opts = opts.journal_mode(SqliteJournalMode::Wal);
    }

    let synchronous = match pairs.get("synchronous") {
        Some(raw) => SqliteSynchronous::from_str(raw)
            .map_err(|_| invalid_pragma("synchronous", raw))?,
        None => SqliteSynchronous::Normal,
    };
    opts = opts.synchronous(synchronous);

    Ok(opts)
}

fn journal_mode(pairs: &HashMap<String, String>) -> Result<Option<SqliteJournalMode>> {
    if let Some(raw) = pairs.get("journal_mode") {
        return SqliteJournalMode::from_str(raw)
            .map(Some)
            .map_err(|_| invalid_pragma("journal_mode", raw));
    }

    match pairs.get("wal").map(|v| v.to_ascii_lowercase()) {
        None => Ok(None),
        Some(v) if v == "true" || v == "1" => Ok(Some(SqliteJournalMode::Wal)),
        Some(v) if v == "false" || v == "0" => Ok(Some(SqliteJournalMode::Delete)),
        Some(v) => Err(invalid_pragma("wal", &v)),
    }
}

fn parse_pragma<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| invalid_pragma(name, raw))
}

fn invalid_pragma(name: &str, raw: &str) -> DbError {
    DbError::SqlitePragma(format!("invalid value '{raw}' for '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_SECONDS: Duration = Duration::from_secs(5);

    #[test]
    fn file_database_defaults() {
        let opts = build_connect_options("sqlite://data/users.db", FIVE_SECONDS).unwrap();
        assert_eq!(opts.get_filename().to_string_lossy(), "data/users.db");
    }

    #[test]
    fn pragma_params_are_stripped_before_sqlx() {
        // sqlx rejects unknown query parameters, so this only parses if stripped
        let opts = build_connect_options(
            "sqlite://data/users.db?journal_mode=delete&synchronous=full&busy_timeout=100",
            FIVE_SECONDS,
        );
        assert!(opts.is_ok());
    }

    #[test]
    fn invalid_pragma_values_are_rejected() {
        for dsn in [
            "sqlite://u.db?synchronous=sometimes",
            "sqlite://u.db?journal_mode=sideways",
            "sqlite://u.db?busy_timeout=-5",
            "sqlite://u.db?wal=maybe",
        ] {
            let err = build_connect_options(dsn, FIVE_SECONDS).unwrap_err();
            assert!(matches!(err, DbError::SqlitePragma(_)), "{dsn}: {err}");
        }
    }

    #[test]
    fn memory_database_parses() {
        assert!(build_connect_options("sqlite::memory:", FIVE_SECONDS).is_ok());
    }
}
