//! Error Types
//!
//! Every fallible operation in the crate returns [`DagError`]. Errors are
//! raised at the call that detects them; nothing is retried or deferred.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DagError>;

/// Errors produced while building or writing a DAG.
#[derive(Debug, Error)]
pub enum DagError {
    /// Something that should describe an invocable function does not.
    #[error("'{name}' is not a callable function: {reason}")]
    NotCallable { name: String, reason: String },

    /// A layer names a parent that has not been added yet.
    #[error(
        "Parent layer '{0}' does not exist in the DAG. \
         Please define it first before adding any children."
    )]
    UnknownParent(String),

    /// A layer with this name is already part of the DAG.
    #[error("Layer '{0}' already exists in the DAG")]
    DuplicateLayer(String),

    /// Submit files need executables relative to the job sandbox.
    #[error("Executable '{}' must be a relative path", .0.display())]
    AbsoluteExecutable(PathBuf),

    /// A layer references a job descriptor nobody registered.
    #[error("Job descriptor '{0}' is not registered")]
    UnknownDescriptor(String),

    /// Structural problems found right before writing.
    #[error("Invalid DAG:\n{0}")]
    InvalidDag(String),

    /// Filesystem failure, with the path that was being touched.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Workflow plan could not be read or understood.
    #[error("Failed to load workflow plan: {0}")]
    Plan(String),
}

impl DagError {
    pub(crate) fn not_callable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotCallable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
