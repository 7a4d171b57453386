/*!
 * Workspace Error Types
 * Structured errors for guarded file operations
 */

use crate::security::types::DenialReason;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Workspace operation result
///
/// # Must Use
/// Workspace operations can fail and must be handled to prevent data loss
#[must_use = "workspace operations can fail and must be handled"]
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Errors from guarded file operations
///
/// Messages are fixed strings: OS error text and resolved paths stay in
/// the logs. Serialization uses the tagged enum pattern so errors can be
/// returned over any wire.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum WorkspaceError {
    #[error("Access denied: {0}")]
    #[diagnostic(code(workspace::denied))]
    Denied(DenialReason),

    #[error("File not found")]
    #[diagnostic(code(workspace::not_found))]
    NotFound,

    #[error("File already exists")]
    #[diagnostic(
        code(workspace::already_exists),
        help("Choose another name, or use write to replace an existing file.")
    )]
    AlreadyExists,

    #[error("Permission denied by the filesystem")]
    #[diagnostic(code(workspace::permission_denied))]
    PermissionDenied,

    #[error("Path is a directory")]
    #[diagnostic(code(workspace::is_a_directory))]
    IsADirectory,

    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    #[diagnostic(code(workspace::file_too_large))]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File operation failed")]
    #[diagnostic(code(workspace::io))]
    Io,
}

impl WorkspaceError {
    /// Classify an OS error, discarding its message
    pub fn from_io(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => WorkspaceError::NotFound,
            io::ErrorKind::AlreadyExists => WorkspaceError::AlreadyExists,
            io::ErrorKind::PermissionDenied => WorkspaceError::PermissionDenied,
            _ => WorkspaceError::Io,
        }
    }

    /// The denial reason, if the gate refused the operation
    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            WorkspaceError::Denied(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<DenialReason> for WorkspaceError {
    fn from(reason: DenialReason) -> Self {
        WorkspaceError::Denied(reason)
    }
}
