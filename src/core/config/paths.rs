use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Builds paths rooted at an explicit data directory, creating it and `logs/`.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            secrets_path,
        }
    }

    /// Resolves a configured path against the data dir unless already absolute.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let candidate = PathBuf::from(raw);
        if candidate.is_absolute() {
            candidate
        } else {
            self.user_data_dir.join(candidate)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// `ANSWERDESK_ROOT`, else the working directory.
fn discover_project_root() -> PathBuf {
    env::var_os("ANSWERDESK_ROOT")
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    data_dir_or_root(env::var_os("ANSWERDESK_DATA_DIR"), project_root)
}

/// The configured data dir, else the project root.
fn data_dir_or_root(configured: Option<OsString>, project_root: &Path) -> PathBuf {
    configured
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| project_root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_absolute_and_joins_relative() {
        let dir = env::temp_dir().join(format!("answerdesk-paths-{}", uuid::Uuid::new_v4()));
        let paths = AppPaths::with_data_dir(dir.clone(), dir.clone());

        assert!(paths.log_dir.exists());
        assert_eq!(paths.resolve("documents.db"), dir.join("documents.db"));

        let absolute = env::temp_dir().join("elsewhere.db");
        assert_eq!(paths.resolve(absolute.to_str().unwrap()), absolute);
    }

    #[test]
    fn data_dir_defaults_to_project_root() {
        let root = PathBuf::from("/srv/answerdesk");
        assert_eq!(data_dir_or_root(None, &root), root);
        assert_eq!(data_dir_or_root(Some(OsString::new()), &root), root);
        assert_eq!(
            data_dir_or_root(Some(OsString::from("/var/lib/answerdesk")), &root),
            PathBuf::from("/var/lib/answerdesk")
        );
    }
}
