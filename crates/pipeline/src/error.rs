use std::fmt;
use std::path::PathBuf;

use cnpj_io::IoError;

#[derive(Debug)]
pub enum PipelineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad delimiter, unknown column, ...).
    ConfigValidation(String),
    /// Input or columnar directory does not exist.
    MissingDirectory(PathBuf),
    /// Reading or writing one of the pipeline's files failed.
    Io(IoError),
    /// Synthetic candidate request that cannot be satisfied.
    Generate(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingDirectory(path) => write!(f, "directory not found: {}", path.display()),
            Self::Io(err) => write!(f, "{err}"),
            Self::Generate(msg) => write!(f, "generate: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IoError> for PipelineError {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
