use crate::context::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    /// An in-memory value has no representation in the target codec.
    #[error("Encoding error in {layer}: {message}")]
    Encoding { layer: String, message: String },

    /// A mandatory section or field is missing or malformed.
    #[error("Structural error at '{path}': {message}")]
    Structural { path: String, message: String },

    #[error("Unsupported savefile version {found} (supported {oldest}..={current})")]
    UnsupportedVersion { found: i64, oldest: i64, current: i64 },

    #[error("Savefile has no 'savefile.version': pre-versioning legacy format")]
    LegacyFormat,

    #[error("Section file syntax error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SaveError {
    pub fn encoding(layer: impl Into<String>, message: impl Into<String>) -> Self {
        SaveError::Encoding { layer: layer.into(), message: message.into() }
    }

    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        SaveError::Structural { path: path.into(), message: message.into() }
    }
}

pub type SaveResult<T> = Result<T, SaveError>;

/// Top-level failure of one save or load call: the first hard error
/// plus every diagnostic recorded up to that point.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct Failure {
    #[source]
    pub error: SaveError,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_layer_and_path() {
        let err = SaveError::encoding("map.t%04d", "terrain 'Volcano' has no code");
        let msg = err.to_string();
        assert!(msg.contains("map.t%04d"), "got: {msg}");
        assert!(msg.contains("Volcano"), "got: {msg}");

        let err = SaveError::structural("savefile.improvement_vector", "missing");
        assert!(err.to_string().contains("savefile.improvement_vector"));
    }

    #[test]
    fn unsupported_version_reports_range() {
        let err = SaveError::UnsupportedVersion { found: 99, oldest: 3, current: 20 };
        let msg = err.to_string();
        assert!(msg.contains("99") && msg.contains("3..=20"), "got: {msg}");
    }

    #[test]
    fn failure_displays_inner_error() {
        let failure = Failure { error: SaveError::LegacyFormat, diagnostics: vec![] };
        assert!(failure.to_string().contains("legacy"));
    }
}
