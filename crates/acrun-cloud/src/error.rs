//! Control plane error types

use thiserror::Error;

/// Errors surfaced by the control plane boundary and the workflows built on it
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("decode failed at {path}: {message}")]
    Decode { path: String, message: String },

    #[error("unknown field {field:?} at {path}")]
    UnknownField { path: String, field: String },

    #[error("{union}: unknown member {key:?}")]
    UnknownVariant { union: String, key: String },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("API error: {0}")]
    Remote(String),

    /// Not a failure: asks the caller to terminate with a specific status.
    #[error("exit status {code}")]
    Exit { code: i32 },

    #[error("{operation}: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    /// Exit status requested by diff when differences were found
    pub const DIFF_EXIT_CODE: i32 = 2;

    pub fn diff_found() -> Self {
        CloudError::Exit {
            code: Self::DIFF_EXIT_CODE,
        }
    }

    /// The innermost error, skipping every `Context` layer
    pub fn root(&self) -> &CloudError {
        let mut current = self;
        while let CloudError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), CloudError::NotFound(_))
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self.root(), CloudError::AccessDenied(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), CloudError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), CloudError::Timeout(_))
    }

    /// Offending wire key of a strict-mode decode failure
    pub fn unknown_field(&self) -> Option<&str> {
        match self.root() {
            CloudError::UnknownField { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Requested process exit status, if this is an exit signal
    pub fn exit_code(&self) -> Option<i32> {
        match self.root() {
            CloudError::Exit { code } => Some(*code),
            _ => None,
        }
    }
}

/// Wrap errors with the name of the operation that failed
pub trait ResultExt<T> {
    fn context(self, operation: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: impl Into<String>) -> Result<T> {
        self.map_err(|source| CloudError::Context {
            operation: operation.into(),
            source: Box::new(source),
        })
    }
}
