use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve the application home directory.
///
/// - `Some(path)`: `~` is expanded against the user's home, relative paths are
///   made absolute against the current working directory.
/// - `None`: platform default, `$HOME/<default_subdir>` on Unix/macOS and
///   `%APPDATA%/<default_subdir>` on Windows.
///
/// When `create` is set the directory is created if missing.
pub fn resolve_home_dir(
    requested: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let resolved = match requested {
        Some(raw) => expand_user_path(raw.trim())?,
        None => platform_base_dir()?.join(default_subdir),
    };

    let absolute = if resolved.is_absolute() {
        resolved
    } else {
        std::env::current_dir()
            .context("cannot determine current directory")?
            .join(resolved)
    };

    if create {
        std::fs::create_dir_all(&absolute)
            .with_context(|| format!("cannot create home_dir '{}'", absolute.display()))?;
    }

    Ok(absolute)
}

fn expand_user_path(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return user_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(user_home()?.join(rest));
    }
    Ok(Path::new(raw).to_path_buf())
}

fn user_home() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("user home directory is not available"))
}

#[cfg(target_os = "windows")]
fn platform_base_dir() -> Result<PathBuf> {
    dirs::data_dir().ok_or_else(|| anyhow!("%APPDATA% is not available"))
}

#[cfg(not(target_os = "windows"))]
fn platform_base_dir() -> Result<PathBuf> {
    user_home()
}
