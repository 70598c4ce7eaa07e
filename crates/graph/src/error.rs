use compliance_vfs::PoolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("no license metadata to analyze")]
    NoInput,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("cannot open license metadata {file:?}: {source}")]
    Open {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read license metadata {file:?}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse license metadata {file:?}: {message}")]
    Parse { file: String, message: String },

    #[error("unknown target {0:?}")]
    UnknownTarget(String),

    #[error("duplicate target {0:?}")]
    DuplicateTarget(String),

    #[error("license metadata reader failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl GraphError {
    /// License metadata file the error concerns, if any
    pub fn file(&self) -> Option<&str> {
        match self {
            GraphError::Open { file, .. }
            | GraphError::Read { file, .. }
            | GraphError::Parse { file, .. } => Some(file),
            GraphError::UnknownTarget(name) | GraphError::DuplicateTarget(name) => Some(name),
            GraphError::NoInput | GraphError::Pool(_) | GraphError::Task(_) => None,
        }
    }
}
