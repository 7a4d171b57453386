/*!
 * Security Module
 * Path sandboxing for workspace file access
 */

pub mod sandbox;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use sandbox::{ensure_extension, AccessGate, RootRegistry};
pub use traits::*;
pub use types::*;
