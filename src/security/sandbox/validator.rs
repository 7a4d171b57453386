/*!
 * Sandbox Validator
 * Segment-wise containment of canonical paths in allowed roots
 */

use crate::security::types::CaseSensitivity;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Decides whether a canonical path lies inside an allowed root
///
/// Comparison is per path component, never by string prefix, so
/// `/data-evil` is not inside `/data`. "Not contained" is an ordinary
/// answer, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxValidator {
    case: CaseSensitivity,
}

impl SandboxValidator {
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    /// True when `candidate` equals `root` or has it as a proper ancestor
    #[must_use]
    pub fn is_within(&self, candidate: &Path, root: &Path) -> bool {
        let mut candidate_components = candidate.components();
        for root_component in root.components() {
            match candidate_components.next() {
                Some(c) if self.component_eq(root_component, c) => {}
                _ => return false,
            }
        }
        true
    }

    /// First root containing `candidate`, if any
    #[must_use]
    pub fn containing_root<'a>(&self, candidate: &Path, roots: &'a [PathBuf]) -> Option<&'a Path> {
        if !candidate.has_root() {
            return None;
        }
        roots
            .iter()
            .map(PathBuf::as_path)
            .find(|root| self.is_within(candidate, root))
    }

    /// True when `candidate` is inside a root or is one of a root's ancestors
    ///
    /// These are the only places resolution may report what it found;
    /// ancestors of a canonical root always exist, so they reveal nothing.
    #[must_use]
    pub fn on_route(&self, candidate: &Path, roots: &[PathBuf]) -> bool {
        candidate.has_root()
            && roots
                .iter()
                .any(|root| self.is_within(candidate, root) || self.is_within(root, candidate))
    }

    fn component_eq(&self, a: Component<'_>, b: Component<'_>) -> bool {
        match self.case {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => fold_eq(a.as_os_str(), b.as_os_str()),
        }
    }
}

/// Case-folded comparison; names that are not valid UTF-8 only match
/// byte-for-byte, since lossy conversion could make distinct names collide.
pub(crate) fn fold_eq(a: &OsStr, b: &OsStr) -> bool {
    match (a.to_str(), b.to_str()) {
        (Some(a), Some(b)) => a == b || a.to_lowercase() == b.to_lowercase(),
        _ => a == b,
    }
}
