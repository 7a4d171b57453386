/*!
 * Sheetgate Library
 * Path sandboxing for spreadsheet workspace file operations
 */

pub mod config;
pub mod core;
pub mod monitoring;
pub mod security;
pub mod vfs;

// Re-exports
pub use config::{ConfigError, ConfigResult, GateConfig};
pub use monitoring::{init_tracing, span_operation};
pub use security::{
    ensure_extension, AccessDecision, AccessGate, CaseSensitivity, DenialReason, ExpectedKind,
    ExtensionRule, Intent, PathGuard, PathRequest, RegistryError, RegistryResult, ResolvedPath,
    RootRegistry,
};
pub use vfs::{GuardedFs, WorkbookEntry, WorkspaceError, WorkspaceResult};
