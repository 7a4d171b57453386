/*!
 * Security Traits
 * Seams between file operations and the access gate
 */

use super::types::*;

/// Anything that can decide whether a path request may proceed
///
/// File operations depend on this rather than on the concrete gate so
/// they can be exercised against a scripted decision source.
#[cfg_attr(test, mockall::automock)]
pub trait PathGuard: Send + Sync {
    /// Decide one request; never fails, expected problems are `Denied`
    fn authorize(&self, request: &PathRequest, kind: &ExpectedKind) -> AccessDecision;
}
