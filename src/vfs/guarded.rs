/*!
 * Guarded Workspace
 * File operations that consult the access gate before touching the disk
 *
 * Each operation asks the guard first with its true intent and only uses
 * the path from an Approved decision. Denials are terminal.
 */

use super::types::*;
use crate::config::GateConfig;
use crate::core::limits::{COPY_SUFFIX, DEFAULT_MAX_FILE_SIZE};
use crate::monitoring::{span_operation, OperationSpan};
use crate::security::traits::PathGuard;
use crate::security::types::*;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Workspace facade over a path guard
#[derive(Clone)]
pub struct GuardedFs {
    guard: Arc<dyn PathGuard>,
    workbook_kind: ExpectedKind,
    max_file_size: u64,
}

impl GuardedFs {
    /// Workspace accepting `.xlsx` workbooks with the default size limit
    pub fn new(guard: Arc<dyn PathGuard>) -> Self {
        Self {
            guard,
            workbook_kind: ExpectedKind::spreadsheet(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn from_config(guard: Arc<dyn PathGuard>, config: &GateConfig) -> Self {
        Self {
            guard,
            workbook_kind: config.spreadsheet_kind(),
            max_file_size: config.max_file_size,
        }
    }

    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = limit;
        self
    }

    pub fn with_workbook_kind(mut self, kind: ExpectedKind) -> Self {
        self.workbook_kind = kind;
        self
    }

    pub fn workbook_kind(&self) -> &ExpectedKind {
        &self.workbook_kind
    }

    /// Read a whole workbook
    pub fn read(&self, path: &str) -> WorkspaceResult<Vec<u8>> {
        traced("read", |_| {
            let resolved = self.authorize(path, Intent::Read, &self.workbook_kind)?;
            let size = file_metadata(resolved.as_path())?.len();
            if size > self.max_file_size {
                return Err(WorkspaceError::FileTooLarge {
                    size,
                    limit: self.max_file_size,
                });
            }
            fs::read(resolved.as_path()).map_err(|e| io_failure(&e))
        })
    }

    /// Replace or create a workbook; the parent directory must exist
    pub fn write(&self, path: &str, data: &[u8]) -> WorkspaceResult<ResolvedPath> {
        traced("write", |_| {
            let resolved = self.authorize(path, Intent::Write, &self.workbook_kind)?;
            fs::write(resolved.as_path(), data).map_err(|e| io_failure(&e))?;
            Ok(resolved)
        })
    }

    /// Create a new workbook, appending the default extension when missing
    ///
    /// Fails with `AlreadyExists` rather than replacing an existing file.
    pub fn create(&self, path: &str, data: &[u8]) -> WorkspaceResult<ResolvedPath> {
        traced("create", |_| {
            let resolved = self.authorize(path, Intent::Create, &self.workbook_kind)?;
            write_new(resolved.as_path(), data)?;
            Ok(resolved)
        })
    }

    pub fn delete(&self, path: &str) -> WorkspaceResult<()> {
        traced("delete", |_| {
            let resolved = self.authorize(path, Intent::Delete, &self.workbook_kind)?;
            file_metadata(resolved.as_path())?;
            fs::remove_file(resolved.as_path()).map_err(|e| io_failure(&e))
        })
    }

    /// Names in a directory, sorted; entries that cannot be read are skipped
    pub fn list_dir(&self, path: &str) -> WorkspaceResult<Vec<Entry>> {
        traced("list_dir", |span| {
            let resolved = self.authorize(path, Intent::List, &ExpectedKind::Directory)?;
            let mut entries: Vec<Entry> = fs::read_dir(resolved.as_path())
                .map_err(|e| io_failure(&e))?
                .filter_map(Result::ok)
                .filter_map(|entry| {
                    let file_type = entry.file_type().ok()?;
                    Some(Entry::new(
                        entry.file_name().to_string_lossy().into_owned(),
                        file_type.into(),
                    ))
                })
                .collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            span.record_items_processed(entries.len());
            Ok(entries)
        })
    }

    /// Workbooks directly inside a directory with size and modification time
    ///
    /// Every candidate goes through the guard as a read, so a link that
    /// leaves the sandbox is skipped instead of leaking metadata. Sorted by
    /// file name, case-insensitively.
    pub fn list_workbooks(&self, path: &str) -> WorkspaceResult<Vec<WorkbookEntry>> {
        traced("list_workbooks", |span| {
            let dir = self.authorize(path, Intent::List, &ExpectedKind::Directory)?;
            let mut workbooks = Vec::new();

            for entry in fs::read_dir(dir.as_path()).map_err(|e| io_failure(&e))? {
                let Ok(entry) = entry else { continue };
                let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let Some(candidate) = entry.path().to_str().map(str::to_string) else {
                    continue;
                };

                let request = PathRequest::read(candidate);
                let resolved = match self.guard.authorize(&request, &self.workbook_kind) {
                    AccessDecision::Approved(resolved) => resolved,
                    AccessDecision::Denied(reason) => {
                        debug!(file = %filename, reason = reason.code(), "Skipping listing entry");
                        continue;
                    }
                };

                let Ok(meta) = fs::metadata(resolved.as_path()) else { continue };
                if !meta.is_file() {
                    continue;
                }
                let Ok(modified) = meta.modified() else { continue };

                workbooks.push(WorkbookEntry::new(
                    filename,
                    meta.len(),
                    modified,
                    resolved.into_path_buf(),
                ));
            }

            workbooks.sort_by_key(|w| w.filename.to_lowercase());
            span.record_items_processed(workbooks.len());
            Ok(workbooks)
        })
    }

    /// Copy a workbook; without a destination the copy is `<stem>_copy<ext>`
    /// next to the source
    pub fn copy(&self, source: &str, destination: Option<&str>) -> WorkspaceResult<ResolvedPath> {
        traced("copy", |_| {
            let source = self.authorize(source, Intent::Read, &self.workbook_kind)?;
            file_metadata(source.as_path())?;

            let destination = match destination {
                Some(raw) => raw.to_string(),
                None => default_copy_name(source.as_path())
                    .ok_or(WorkspaceError::Denied(DenialReason::InvalidPath))?,
            };
            let target = self.authorize(&destination, Intent::Create, &self.workbook_kind)?;

            let mut reader = fs::File::open(source.as_path()).map_err(|e| io_failure(&e))?;
            let mut writer = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(target.as_path())
                .map_err(|e| io_failure(&e))?;
            io::copy(&mut reader, &mut writer).map_err(|e| io_failure(&e))?;
            writer.flush().map_err(|e| io_failure(&e))?;
            Ok(target)
        })
    }

    fn authorize(&self, raw: &str, intent: Intent, kind: &ExpectedKind) -> WorkspaceResult<ResolvedPath> {
        self.guard
            .authorize(&PathRequest::new(raw, intent), kind)
            .into_result()
            .map_err(WorkspaceError::Denied)
    }
}

fn traced<T>(
    operation: &str,
    body: impl FnOnce(&OperationSpan) -> WorkspaceResult<T>,
) -> WorkspaceResult<T> {
    let span = span_operation(operation);
    let _entered = span.enter();
    let result = body(&span);
    match &result {
        Ok(_) => span.record_result(true),
        Err(WorkspaceError::Denied(reason)) => span.record_denial(reason.code()),
        Err(_) => span.record_result(false),
    }
    result
}

/// Metadata of a path that must not be a directory
fn file_metadata(path: &Path) -> WorkspaceResult<fs::Metadata> {
    let meta = fs::metadata(path).map_err(|e| io_failure(&e))?;
    if meta.is_dir() {
        return Err(WorkspaceError::IsADirectory);
    }
    Ok(meta)
}

fn write_new(path: &Path, data: &[u8]) -> WorkspaceResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| io_failure(&e))?;
    file.write_all(data).map_err(|e| io_failure(&e))?;
    file.flush().map_err(|e| io_failure(&e))
}

/// `<dir>/<stem>_copy<.ext>` as an absolute path string
fn default_copy_name(source: &Path) -> Option<String> {
    let stem = source.file_stem()?;
    let mut name = OsString::from(stem);
    name.push(COPY_SUFFIX);
    if let Some(ext) = source.extension() {
        name.push(".");
        name.push(ext);
    }
    source.with_file_name(name).to_str().map(str::to_string)
}

fn io_failure(e: &io::Error) -> WorkspaceError {
    debug!(error = %e, "Workspace I/O failed");
    WorkspaceError::from_io(e)
}
