use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardError>;

/// Fatal errors. These abort a whole invocation, before any scanning starts
/// or while writing results.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("No extension roots given")]
    NoRoots,

    #[error("Extension root is missing or not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Could not load extension at {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GuardError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Per-extension load failures. Discovery downgrades every one of these to
/// a skipped entry; none of them stops a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("no manifest.json in {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed manifest {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("permission denied reading {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("timed out reading {}", .0.display())]
    TimedOut(PathBuf),
}

impl LoadError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map an IO failure on `path` into the load taxonomy.
    pub(crate) fn from_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            std::io::ErrorKind::TimedOut => Self::TimedOut(path),
            std::io::ErrorKind::InvalidData => Self::malformed(path, err.to_string()),
            _ => Self::malformed(path, format!("unreadable: {err}")),
        }
    }

    /// Short stable tag for reports.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Malformed { .. } => "malformed",
            Self::PermissionDenied(_) => "permission_denied",
            Self::TimedOut(_) => "timed_out",
        }
    }
}
