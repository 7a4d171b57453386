/*!
 * Path Normalizer
 * Turns raw request strings into canonical absolute paths
 *
 * Resolution walks the path one segment at a time against the real
 * filesystem, expanding symbolic links as they are met, so `..` always
 * applies to the physical parent. Nothing is cached between calls.
 */

use crate::core::limits::{MAX_PATH_BYTES, MAX_SEGMENT_BYTES, MAX_SYMLINK_HOPS};
use crate::security::types::DenialReason;
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a raw path could not be resolved
///
/// Internal detail only: the gate reports these as a [`DenialReason`] and
/// logs the rest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("path is empty")]
    Empty,

    #[error("path contains a null byte")]
    NulByte,

    #[error("path or one of its segments is too long")]
    TooLong,

    #[error("an intermediate path segment does not exist")]
    MissingComponent,

    #[error("an intermediate path segment is not a directory")]
    NotADirectory,

    #[error("too many symbolic links (more than {0} hops)")]
    SymlinkLoop(usize),

    #[error("symbolic link has an empty target")]
    EmptyLinkTarget,

    #[error("filesystem error: {0:?}")]
    Io(io::ErrorKind),

    #[error("resolution left the fenced area")]
    Escaped,
}

impl ResolveError {
    /// Map to the public denial set
    #[must_use]
    pub fn reason(&self) -> DenialReason {
        match self {
            ResolveError::Io(_) => DenialReason::IoFailure,
            ResolveError::Escaped => DenialReason::OutsideSandbox,
            _ => DenialReason::InvalidPath,
        }
    }
}

/// Where the caller's own final name was looked up, before any link at
/// that name was followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry {
    pub dir: PathBuf,
    pub name: OsString,
}

/// A successful walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub canonical: PathBuf,
    /// `None` when the input ends in `..` or names no segment at all
    pub leaf: Option<LeafEntry>,
}

#[derive(Debug)]
enum Segment {
    Parent,
    Name(OsString),
}

/// Stateless path resolver; cheap to clone and share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathNormalizer {
    backslash_separators: bool,
    max_symlink_hops: usize,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self {
            backslash_separators: true,
            max_symlink_hops: MAX_SYMLINK_HOPS,
        }
    }
}

impl PathNormalizer {
    pub fn new(backslash_separators: bool, max_symlink_hops: usize) -> Self {
        Self {
            backslash_separators,
            max_symlink_hops: max_symlink_hops.max(1),
        }
    }

    pub fn max_symlink_hops(&self) -> usize {
        self.max_symlink_hops
    }

    /// Syntactic validation and separator normalization, no filesystem access
    pub fn parse(&self, raw: &str) -> Result<PathBuf, ResolveError> {
        if raw.trim().is_empty() {
            return Err(ResolveError::Empty);
        }
        if raw.contains('\0') {
            return Err(ResolveError::NulByte);
        }
        if raw.len() > MAX_PATH_BYTES {
            return Err(ResolveError::TooLong);
        }

        let unified = if self.backslash_separators && !cfg!(windows) {
            raw.replace('\\', "/")
        } else {
            raw.to_string()
        };

        let over_long = unified
            .split(|c: char| c == '/' || (cfg!(windows) && c == '\\'))
            .any(|segment| segment.len() > MAX_SEGMENT_BYTES);
        if over_long {
            return Err(ResolveError::TooLong);
        }

        Ok(PathBuf::from(unified))
    }

    /// Parse `raw`, anchor it at `base` when relative, and resolve it
    pub fn normalize(
        &self,
        raw: &str,
        base: &Path,
        allow_missing_leaf: bool,
    ) -> Result<PathBuf, ResolveError> {
        self.locate(raw, base, allow_missing_leaf, |_: &Path| true)
            .map(|resolution| resolution.canonical)
    }

    /// Like [`normalize`](Self::normalize), but only reports filesystem
    /// detail for paths the fence admits
    ///
    /// A lookup that fails outside the fence, or a `..` taken from a
    /// directory outside it, ends the walk with [`ResolveError::Escaped`],
    /// so the answer never depends on what exists out there.
    pub fn locate<F>(
        &self,
        raw: &str,
        base: &Path,
        allow_missing_leaf: bool,
        fence: F,
    ) -> Result<Resolution, ResolveError>
    where
        F: Fn(&Path) -> bool,
    {
        let parsed = self.parse(raw)?;
        let absolute = if parsed.has_root() {
            parsed
        } else {
            base.join(parsed)
        };
        let mut anchor = PathBuf::new();
        let segments = Self::split(&absolute, &mut anchor);
        self.walk(anchor, segments.into(), allow_missing_leaf, &fence)
    }

    /// Resolve an absolute path against the filesystem
    ///
    /// Every existing segment is inspected with `lstat`; links are expanded
    /// in place and count towards the hop limit. Only the final segment may
    /// be missing, and only when `allow_missing_leaf` is set.
    pub fn resolve(&self, absolute: &Path, allow_missing_leaf: bool) -> Result<PathBuf, ResolveError> {
        let mut anchor = PathBuf::new();
        let segments = Self::split(absolute, &mut anchor);
        self.walk(anchor, segments.into(), allow_missing_leaf, &|_: &Path| true)
            .map(|resolution| resolution.canonical)
    }

    /// Resolve a single new leaf under an already-canonical directory
    ///
    /// Used after a rename of the final segment, so the parent chain is not
    /// walked a second time. A name carrying its own anchor restarts there.
    pub fn resolve_child<F>(
        &self,
        parent: &Path,
        name: &OsStr,
        allow_missing_leaf: bool,
        fence: F,
    ) -> Result<Resolution, ResolveError>
    where
        F: Fn(&Path) -> bool,
    {
        let mut anchor = PathBuf::new();
        let segments = Self::split(Path::new(name), &mut anchor);
        let start = if anchor.as_os_str().is_empty() {
            parent.to_path_buf()
        } else {
            anchor
        };
        self.walk(start, segments.into(), allow_missing_leaf, &fence)
    }

    fn walk(
        &self,
        mut resolved: PathBuf,
        mut pending: VecDeque<Segment>,
        allow_missing_leaf: bool,
        fence: &dyn Fn(&Path) -> bool,
    ) -> Result<Resolution, ResolveError> {
        let mut hops = 0usize;
        // Link expansions go to the front, so the caller's own segments
        // are always the last `from_input` entries of `pending`.
        let mut from_input = pending.len();
        let mut leaf = None;

        let fenced = |error: ResolveError, at: &Path| {
            if fence(at) {
                error
            } else {
                ResolveError::Escaped
            }
        };

        while let Some(segment) = pending.pop_front() {
            let is_input = pending.len() < from_input;
            if is_input {
                from_input -= 1;
            }

            let name = match segment {
                Segment::Parent => {
                    if !fence(&resolved) {
                        return Err(ResolveError::Escaped);
                    }
                    resolved.pop();
                    continue;
                }
                Segment::Name(name) => name,
            };

            if is_input && from_input == 0 {
                leaf = Some(LeafEntry {
                    dir: resolved.clone(),
                    name: name.clone(),
                });
            }

            let candidate = resolved.join(&name);
            let is_last = pending.is_empty();

            match fs::symlink_metadata(&candidate) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    hops += 1;
                    if hops > self.max_symlink_hops {
                        return Err(fenced(ResolveError::SymlinkLoop(self.max_symlink_hops), &candidate));
                    }
                    let target = fs::read_link(&candidate)
                        .map_err(|e| fenced(ResolveError::Io(e.kind()), &candidate))?;
                    if target.as_os_str().is_empty() {
                        return Err(fenced(ResolveError::EmptyLinkTarget, &candidate));
                    }

                    // Absolute targets restart from their own anchor; relative
                    // ones continue from the link's parent, which is `resolved`.
                    let mut anchor = PathBuf::new();
                    let target_segments = Self::split(&target, &mut anchor);
                    if target.has_root() {
                        resolved = anchor;
                    }
                    for seg in target_segments.into_iter().rev() {
                        pending.push_front(seg);
                    }
                }
                Ok(meta) => {
                    if !is_last && !meta.is_dir() {
                        return Err(fenced(ResolveError::NotADirectory, &candidate));
                    }
                    resolved = candidate;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if is_last && allow_missing_leaf {
                        resolved = candidate;
                    } else {
                        return Err(fenced(ResolveError::MissingComponent, &candidate));
                    }
                }
                Err(e) => return Err(fenced(ResolveError::Io(e.kind()), &candidate)),
            }
        }

        Ok(Resolution {
            canonical: resolved,
            leaf,
        })
    }

    /// Split a path into its anchor (prefix and root, written to `anchor`)
    /// and the remaining segments
    fn split(path: &Path, anchor: &mut PathBuf) -> Vec<Segment> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Prefix(prefix) => anchor.push(prefix.as_os_str()),
                Component::RootDir => anchor.push(Component::RootDir.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => segments.push(Segment::Parent),
                Component::Normal(name) => segments.push(Segment::Name(name.to_os_string())),
            }
        }
        segments
    }
}
