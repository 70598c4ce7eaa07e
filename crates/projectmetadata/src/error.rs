use compliance_vfs::PoolError;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Syntax or schema error in a METADATA body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("error opening project {project:?} metadata {path:?}: {source}")]
    Open {
        project: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading project {project:?} metadata {path:?}: {source}")]
    Read {
        project: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error in project {project:?} metadata {path:?}: {source}")]
    Parse {
        project: String,
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("reader for project {project:?} stopped without publishing a result")]
    ReaderAborted { project: String },

    /// One entry per requested project that failed
    #[error("error reading project(s):\n{}", render_failures(.failures))]
    Projects { failures: Vec<Arc<MetadataError>> },
}

impl MetadataError {
    /// Project the error is bound to, if it concerns a single project
    pub fn project(&self) -> Option<&str> {
        match self {
            MetadataError::Open { project, .. }
            | MetadataError::Read { project, .. }
            | MetadataError::Parse { project, .. }
            | MetadataError::ReaderAborted { project } => Some(project),
            MetadataError::Pool(_) | MetadataError::Projects { .. } => None,
        }
    }

    pub fn failures(&self) -> &[Arc<MetadataError>] {
        match self {
            MetadataError::Projects { failures } => failures,
            _ => &[],
        }
    }
}

fn render_failures(failures: &[Arc<MetadataError>]) -> String {
    failures
        .iter()
        .map(|failure| format!("  {failure}\n"))
        .collect()
}
