/*!
 * Directory Entries
 * Listing records returned by the guarded workspace
 */

use super::file_type::FileType;
use crate::core::serde::system_time_secs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// One name in a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default)]
    pub file_type: FileType,
}

impl Entry {
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }

    #[inline]
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::File)
    }
}

/// Workbook metadata for spreadsheet listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookEntry {
    pub filename: String,
    /// Size in KiB rounded to two decimals
    pub size_kb: f64,
    #[serde(with = "system_time_secs")]
    pub modified: SystemTime,
    /// Canonical path of the workbook
    pub path: PathBuf,
}

impl WorkbookEntry {
    pub fn new(filename: String, size_bytes: u64, modified: SystemTime, path: PathBuf) -> Self {
        Self {
            filename,
            size_kb: kib_rounded(size_bytes),
            modified,
            path,
        }
    }
}

fn kib_rounded(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}
