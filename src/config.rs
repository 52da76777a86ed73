use std::path::PathBuf;
use std::time::Duration;

pub const ENV_REMOTE_URI: &str = "MEU_EMPREGO_REMOTE_URI";
pub const ENV_DB_NAME: &str = "MEU_EMPREGO_DB_NAME";
pub const ENV_CSV_PATH: &str = "CANDIDATURAS_CSV_PATH";

pub const DEFAULT_DB_NAME: &str = "meu_emprego";
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(6);

const CSV_FILE_NAME: &str = "candidaturas.csv";

/// Everything the persistence layer needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `None` selects pure-local mode.
    pub remote_uri: Option<String>,
    pub db_name: String,
    pub csv_path: PathBuf,
    pub connect_timeout: Duration,
}

impl StoreConfig {
    /// Applies defaults to whatever was supplied. A blank URI or database
    /// name counts as absent.
    pub fn resolve(
        remote_uri: Option<String>,
        db_name: Option<String>,
        csv_path: Option<PathBuf>,
    ) -> Self {
        let non_blank = |s: String| {
            let s = s.trim().to_string();
            (!s.is_empty()).then_some(s)
        };
        Self {
            remote_uri: remote_uri.and_then(non_blank),
            db_name: db_name
                .and_then(non_blank)
                .unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            csv_path: csv_path
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(default_csv_path),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Pure-local configuration backed by `csv_path`.
    #[allow(dead_code)]
    pub fn local(csv_path: impl Into<PathBuf>) -> Self {
        Self::resolve(None, None, Some(csv_path.into()))
    }
}

pub fn default_csv_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "emprego") {
        proj_dirs.data_dir().join(CSV_FILE_NAME)
    } else {
        PathBuf::from("assets").join(CSV_FILE_NAME)
    }
}
