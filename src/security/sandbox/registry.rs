/*!
 * Root Registry
 * Immutable set of allow-listed base directories, built once at startup
 */

use super::validator::fold_eq;
use crate::security::types::{CaseSensitivity, RegistryError, RegistryResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Allowed roots, canonical and deduplicated
///
/// Cloning shares the same backing slice; there is no mutation API, so
/// every reader sees the fully initialized set.
#[derive(Debug, Clone)]
pub struct RootRegistry {
    roots: Arc<[PathBuf]>,
}

impl RootRegistry {
    /// Canonicalize and verify every raw root
    ///
    /// Fails on the first root that is malformed, missing, not a directory
    /// or unreadable. Roots equal after canonicalization (and case folding,
    /// when configured) are collapsed, keeping the first occurrence.
    pub fn initialize<I, S>(raw_roots: I, case: CaseSensitivity) -> RegistryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roots: Vec<PathBuf> = Vec::new();

        for raw in raw_roots {
            let canonical = Self::probe(raw.as_ref())?;
            let duplicate = roots.iter().any(|existing| match case {
                CaseSensitivity::Sensitive => existing == &canonical,
                CaseSensitivity::Insensitive => {
                    existing.components().count() == canonical.components().count()
                        && existing
                            .components()
                            .zip(canonical.components())
                            .all(|(a, b)| fold_eq(a.as_os_str(), b.as_os_str()))
                }
            });
            if duplicate {
                info!(root = %canonical.display(), "Collapsed duplicate allowed root");
                continue;
            }
            roots.push(canonical);
        }

        if roots.is_empty() {
            return Err(RegistryError::NoRoots);
        }

        info!(count = roots.len(), "Root registry initialized");
        Ok(Self {
            roots: roots.into(),
        })
    }

    /// Registry with no roots; every gate decision is a denial
    pub fn empty() -> Self {
        Self {
            roots: Arc::from(Vec::new()),
        }
    }

    fn probe(raw: &str) -> RegistryResult<PathBuf> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.contains('\0') {
            return Err(RegistryError::InvalidRoot(raw.to_string()));
        }

        let canonical = fs::canonicalize(trimmed).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RegistryError::MissingRoot(trimmed.to_string()),
            _ => RegistryError::UnreadableRoot(trimmed.to_string()),
        })?;

        let meta = fs::metadata(&canonical)
            .map_err(|_| RegistryError::UnreadableRoot(trimmed.to_string()))?;
        if !meta.is_dir() {
            return Err(RegistryError::NotADirectory(trimmed.to_string()));
        }

        fs::read_dir(&canonical).map_err(|_| RegistryError::UnreadableRoot(trimmed.to_string()))?;

        Ok(canonical)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Anchor for relative request paths
    pub fn primary(&self) -> Option<&Path> {
        self.roots.first().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Re-probe every root; false if any has vanished or stopped being a directory
    pub fn verify_available(&self) -> bool {
        if self.roots.is_empty() {
            return false;
        }
        for root in self.roots.iter() {
            let available = fs::metadata(root).map(|m| m.is_dir()).unwrap_or(false);
            if !available {
                warn!(root = %root.display(), "Allowed root is no longer available");
                return false;
            }
        }
        true
    }
}
