/*!
 * Kind Enforcer
 * Checks that a resolved path names the kind of resource an operation expects
 */

use crate::security::types::{ExpectedKind, ExtensionRule, Intent};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::Path;

/// Result of a kind check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOutcome {
    Accepted,
    /// Create with a missing extension; holds the new leaf name with the
    /// default appended
    Transformed(OsString),
    Rejected,
}

/// Stateless kind checker, independent of sandboxing
#[derive(Debug, Clone, Copy, Default)]
pub struct KindEnforcer;

impl KindEnforcer {
    pub fn new() -> Self {
        Self
    }

    /// Check `path` against `kind`
    ///
    /// `path` must already be canonical. `supplied` is the leaf name the
    /// caller wrote, which can differ from the canonical leaf when it is a
    /// link; a rename on create is built from it. Unexpected metadata
    /// errors are returned so the caller can report an I/O failure.
    pub fn enforce(
        &self,
        path: &Path,
        supplied: Option<&OsStr>,
        intent: Intent,
        kind: &ExpectedKind,
    ) -> io::Result<KindOutcome> {
        match kind {
            ExpectedKind::Any => Ok(KindOutcome::Accepted),
            ExpectedKind::Directory => match probe(path)? {
                Some(meta) if meta.is_dir() => Ok(KindOutcome::Accepted),
                _ => Ok(KindOutcome::Rejected),
            },
            ExpectedKind::Extension(rule) => self.enforce_extension(path, supplied, intent, rule),
        }
    }

    fn enforce_extension(
        &self,
        path: &Path,
        supplied: Option<&OsStr>,
        intent: Intent,
        rule: &ExtensionRule,
    ) -> io::Result<KindOutcome> {
        if let Some(meta) = probe(path)? {
            if meta.is_dir() {
                return Ok(KindOutcome::Rejected);
            }
        }

        let Some(leaf) = path.file_name() else {
            return Ok(KindOutcome::Rejected);
        };

        if rule.matches(&leaf.to_string_lossy()) {
            return Ok(KindOutcome::Accepted);
        }

        match (intent, rule.default_extension()) {
            (Intent::Create, Some(default)) => {
                let name = supplied.unwrap_or(leaf);
                let renamed = match name.to_str() {
                    Some(name) => OsString::from(ensure_extension(name, default)),
                    None => {
                        let mut raw = name.to_os_string();
                        raw.push(default);
                        raw
                    }
                };
                Ok(KindOutcome::Transformed(renamed))
            }
            _ => Ok(KindOutcome::Rejected),
        }
    }
}

/// Metadata for `path`, `None` when it does not exist
fn probe(path: &Path) -> io::Result<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Append `ext` to `name` unless it already ends with it (ASCII case-insensitive)
///
/// # Examples
///
/// ```
/// use sheetgate::security::ensure_extension;
///
/// assert_eq!(ensure_extension("report", ".xlsx"), "report.xlsx");
/// assert_eq!(ensure_extension("Report.XLSX", ".xlsx"), "Report.XLSX");
/// ```
pub fn ensure_extension(name: &str, ext: &str) -> String {
    if name.to_ascii_lowercase().ends_with(&ext.to_ascii_lowercase()) {
        name.to_string()
    } else {
        format!("{}{}", name, ext)
    }
}
