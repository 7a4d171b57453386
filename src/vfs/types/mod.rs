/*!
 * Workspace Types
 * Shared types for guarded filesystem operations
 */

mod entry;
mod errors;
mod file_type;

pub use entry::{Entry, WorkbookEntry};
pub use errors::{WorkspaceError, WorkspaceResult};
pub use file_type::FileType;
