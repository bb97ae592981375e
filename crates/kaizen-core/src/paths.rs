use crate::error::{KaizenError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const KAIZEN_DIR: &str = ".kaizen";
pub const UPLOADS_DIR: &str = ".kaizen/uploads";

pub const CONFIG_FILE: &str = ".kaizen/config.yaml";
pub const DIRECTORY_FILE: &str = ".kaizen/directory.yaml";
pub const DB_FILE: &str = ".kaizen/opportunities.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn kaizen_dir(root: &Path) -> PathBuf {
    root.join(KAIZEN_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn directory_path(root: &Path) -> PathBuf {
    root.join(DIRECTORY_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

pub fn uploads_dir(root: &Path) -> PathBuf {
    root.join(UPLOADS_DIR)
}

/// Fails with `NotInitialized` unless `kaizen init` has run in `root`.
pub fn require_initialized(root: &Path) -> Result<()> {
    if kaizen_dir(root).is_dir() {
        Ok(())
    } else {
        Err(KaizenError::NotInitialized)
    }
}

// ---------------------------------------------------------------------------
// Upload filenames
// ---------------------------------------------------------------------------

static UNSAFE_RE: OnceLock<Regex> = OnceLock::new();

fn unsafe_re() -> &'static Regex {
    UNSAFE_RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"))
}

/// Reduce a client-supplied filename to a safe single path component.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = unsafe_re().replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() || cleaned.len() > 128 {
        return Err(KaizenError::Validation(format!(
            "invalid upload filename '{name}'"
        )));
    }
    Ok(cleaned.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("trend.png").unwrap(), "trend.png");
        assert_eq!(sanitize_filename("p-chart_v2.xlsx").unwrap(), "p-chart_v2.xlsx");
    }

    #[test]
    fn sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\iso plot.pdf").unwrap(), "iso_plot.pdf");
        assert_eq!(sanitize_filename(".hidden").unwrap(), "hidden");
    }

    #[test]
    fn sanitize_rejects_empty() {
        for name in ["", "   ", "dir/", ".."] {
            assert!(sanitize_filename(name).is_err(), "expected invalid: {name:?}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/ci");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/ci/.kaizen/config.yaml")
        );
        assert_eq!(
            db_path(root),
            PathBuf::from("/tmp/ci/.kaizen/opportunities.db")
        );
    }

    #[test]
    fn uninitialized_root_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            require_initialized(tmp.path()),
            Err(KaizenError::NotInitialized)
        ));
        std::fs::create_dir_all(kaizen_dir(tmp.path())).unwrap();
        require_initialized(tmp.path()).unwrap();
    }
}
