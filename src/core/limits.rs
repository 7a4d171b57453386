/*!
 * Gate Limits and Constants
 *
 * Centralized location for the bounds applied during path resolution and
 * guarded file access.
 *
 * - Security-critical constants are marked with [SECURITY]
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// PATH RESOLUTION
// =============================================================================

/// Maximum symbolic links followed while resolving a single request
/// [SECURITY] Bounds resolution so a link cycle ends in a denial
/// [LINUX-COMPAT] Matches MAXSYMLINKS in fs/namei.c
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Maximum raw path length in bytes
/// [LINUX-COMPAT] PATH_MAX
pub const MAX_PATH_BYTES: usize = 4096;

/// Maximum length of a single path segment in bytes
/// [LINUX-COMPAT] NAME_MAX
pub const MAX_SEGMENT_BYTES: usize = 255;

/// Upper bound on a single asynchronous resolution
/// [SECURITY] Pathological filesystems (hung network mounts) must not stall callers
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// FILE KINDS
// =============================================================================

/// Extension appended to workbook names created without one
pub const DEFAULT_EXTENSION: &str = ".xlsx";

/// Maximum size of a workbook read through the guarded workspace (100MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Suffix inserted before the extension when copying without a destination
pub const COPY_SUFFIX: &str = "_copy";
