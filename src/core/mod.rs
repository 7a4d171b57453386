/*!
 * Core Module
 * Shared constants and serde helpers
 */

pub mod limits;
pub mod serde;

// Re-export for convenience
pub use limits::*;
