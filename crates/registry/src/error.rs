use quxat_model::AccreditationType;
use std::path::PathBuf;

/// Why a registry could not be loaded.
///
/// Kept per accreditation type; the affected type is unconfirmable while the
/// rest of the store stays usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("registry file not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to read registry {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("malformed registry {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("no registry configured for {0}")]
    NotConfigured(AccreditationType),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::Missing { path };
        }
        Self::Io {
            path,
            message: source.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}
