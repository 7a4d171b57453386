/*!
 * Security Types
 * Requests, decisions and the closed denial set shared by the gate and its callers
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Root registry result
///
/// # Must Use
/// Registry construction is startup-fatal on failure and must be handled
#[must_use = "registry initialization can fail and must be handled"]
pub type RegistryResult<T> = Result<T, RegistryError>;

/// What the caller intends to do with a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Read,
    Write,
    Create,
    Delete,
    List,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Read,
        Intent::Write,
        Intent::Create,
        Intent::Delete,
        Intent::List,
    ];

    /// Whether the final path segment may be absent at decision time
    #[inline]
    #[must_use]
    pub const fn allows_missing_leaf(self) -> bool {
        matches!(self, Intent::Write | Intent::Create)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Intent::Read => "read",
            Intent::Write => "write",
            Intent::Create => "create",
            Intent::Delete => "delete",
            Intent::List => "list",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown intent '{}'", s))
    }
}

/// A raw, caller-supplied path plus its intent. Built per call and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    raw: String,
    intent: Intent,
}

impl PathRequest {
    pub fn new(raw: impl Into<String>, intent: Intent) -> Self {
        Self {
            raw: raw.into(),
            intent,
        }
    }

    #[inline]
    pub fn read(raw: impl Into<String>) -> Self {
        Self::new(raw, Intent::Read)
    }

    #[inline]
    pub fn write(raw: impl Into<String>) -> Self {
        Self::new(raw, Intent::Write)
    }

    #[inline]
    pub fn create(raw: impl Into<String>) -> Self {
        Self::new(raw, Intent::Create)
    }

    #[inline]
    pub fn delete(raw: impl Into<String>) -> Self {
        Self::new(raw, Intent::Delete)
    }

    #[inline]
    pub fn list(raw: impl Into<String>) -> Self {
        Self::new(raw, Intent::List)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }
}

/// Canonical, sandbox-contained path produced by an approval
///
/// Only the gate constructs these; holding one means every check passed
/// at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPath {
    path: PathBuf,
    root: PathBuf,
    intent: Intent,
}

impl ResolvedPath {
    pub(crate) fn new(path: PathBuf, root: PathBuf, intent: Intent) -> Self {
        Self { path, root, intent }
    }

    /// The canonical absolute path
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// The allowed root that contains this path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// Path relative to its root; empty when the path is the root itself
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(Path::new(""))
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Closed set of reasons a request can be denied
///
/// Display strings are stable and safe to show to end users: they never
/// contain resolved paths or OS error text.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    #[error("invalid path")]
    #[diagnostic(
        code(gate::invalid_path),
        help("The path is empty, malformed, loops through symbolic links, or a parent directory does not exist.")
    )]
    InvalidPath,

    #[error("path is outside the allowed directories")]
    #[diagnostic(
        code(gate::outside_sandbox),
        help("Use a path inside one of the configured workspace directories.")
    )]
    OutsideSandbox,

    #[error("path does not point to the expected kind of file")]
    #[diagnostic(
        code(gate::wrong_kind),
        help("Check the file extension, or whether the path names a directory.")
    )]
    WrongKind,

    #[error("no allowed directories are available")]
    #[diagnostic(
        code(gate::root_registry_unavailable),
        help("Configure at least one existing workspace directory and make sure it has not been removed.")
    )]
    RootRegistryUnavailable,

    #[error("the filesystem could not be inspected")]
    #[diagnostic(
        code(gate::io_failure),
        help("A filesystem error occurred while checking the path. Retry, or contact the operator.")
    )]
    IoFailure,
}

impl DenialReason {
    /// Stable machine-readable code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            DenialReason::InvalidPath => "invalid_path",
            DenialReason::OutsideSandbox => "outside_sandbox",
            DenialReason::WrongKind => "wrong_kind",
            DenialReason::RootRegistryUnavailable => "root_registry_unavailable",
            DenialReason::IoFailure => "io_failure",
        }
    }
}

/// Outcome of a single gate call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "details")]
pub enum AccessDecision {
    Approved(ResolvedPath),
    Denied(DenialReason),
}

impl AccessDecision {
    #[inline]
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, AccessDecision::Approved(_))
    }

    #[must_use]
    pub fn approved(&self) -> Option<&ResolvedPath> {
        match self {
            AccessDecision::Approved(path) => Some(path),
            AccessDecision::Denied(_) => None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            AccessDecision::Approved(_) => None,
            AccessDecision::Denied(reason) => Some(*reason),
        }
    }

    /// Convert into a `Result` so callers can use `?`
    pub fn into_result(self) -> Result<ResolvedPath, DenialReason> {
        match self {
            AccessDecision::Approved(path) => Ok(path),
            AccessDecision::Denied(reason) => Err(reason),
        }
    }
}

/// How path segments are compared against allowed roots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

/// Extension requirement for typed resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionRule {
    accepted: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

impl ExtensionRule {
    /// Extensions must include the leading dot; the default, if any, is
    /// added to the accepted list when missing.
    pub fn new(accepted: Vec<String>, default: Option<String>) -> Self {
        let mut accepted = accepted;
        if let Some(ext) = &default {
            if !accepted.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
                accepted.push(ext.clone());
            }
        }
        Self { accepted, default }
    }

    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    pub fn default_extension(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// ASCII case-insensitive suffix match on the file name
    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.accepted.iter().any(|ext| {
            let ext = ext.to_ascii_lowercase();
            lower.len() > ext.len() && lower.ends_with(&ext)
        })
    }
}

/// The kind of resource an operation expects at the resolved path
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rule")]
pub enum ExpectedKind {
    #[default]
    Any,
    Directory,
    Extension(ExtensionRule),
}

impl ExpectedKind {
    /// `.xlsx` workbooks, appending `.xlsx` on create
    pub fn spreadsheet() -> Self {
        let ext = crate::core::limits::DEFAULT_EXTENSION.to_string();
        ExpectedKind::Extension(ExtensionRule::new(vec![ext.clone()], Some(ext)))
    }
}

/// Startup-fatal registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum RegistryError {
    #[error("No allowed roots configured")]
    #[diagnostic(
        code(registry::no_roots),
        help("Set SHEETGATE_ROOTS or pass --root with at least one directory.")
    )]
    NoRoots,

    #[error("Allowed root is not a valid path: {0:?}")]
    #[diagnostic(
        code(registry::invalid_root),
        help("Root paths must be non-empty and cannot contain null bytes.")
    )]
    InvalidRoot(String),

    #[error("Allowed root does not exist: {0}")]
    #[diagnostic(
        code(registry::missing_root),
        help("Create the directory before starting, or fix the configured path.")
    )]
    MissingRoot(String),

    #[error("Allowed root is not a directory: {0}")]
    #[diagnostic(code(registry::not_a_directory))]
    NotADirectory(String),

    #[error("Allowed root is not readable: {0}")]
    #[diagnostic(
        code(registry::unreadable_root),
        help("The process needs permission to list the directory.")
    )]
    UnreadableRoot(String),
}
