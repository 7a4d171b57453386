/*!
 * Workspace File System Module
 * Gated file operations over the allowed roots
 */

pub mod guarded;
pub mod types;

// Re-exports
pub use guarded::GuardedFs;
pub use types::{Entry, FileType, WorkbookEntry, WorkspaceError, WorkspaceResult};
