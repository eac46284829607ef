use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    /// Wrong landmark count or coordinate arity.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
