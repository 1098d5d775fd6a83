//! SQLite-specific helpers: DSN parsing, file preparation and typed
//! connection options.

pub(crate) mod dsn;
pub(crate) mod options;
pub(crate) mod path;

pub(crate) use dsn::is_memory_dsn;
pub(crate) use options::build_connect_options;
pub(crate) use path::prepare_sqlite_path;
