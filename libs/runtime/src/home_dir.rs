use std::io;
use std::path::PathBuf;

/// Resolve the service home directory into an absolute path.
///
/// - `None` → `<user home>/<default_subdir>`
/// - `~` or `~/...` → expanded against the user home
/// - relative paths → joined with the current working directory
///
/// When `create` is set the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> io::Result<PathBuf> {
    let user_home = || {
        dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "cannot determine user home directory")
        })
    };

    let path = match configured {
        None => user_home()?.join(default_subdir),
        Some(raw) if raw == "~" => user_home()?,
        Some(raw) => match raw.strip_prefix("~/") {
            Some(rest) => user_home()?.join(rest),
            None => PathBuf::from(raw),
        },
    };

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };

    if create {
        std::fs::create_dir_all(&path)?;
    }

    Ok(path)
}
