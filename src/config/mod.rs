/*!
 * Gate Configuration
 *
 * One explicit object built at startup and handed to the gate. The gate
 * itself never reads the environment; only `from_env` does.
 */

use crate::core::limits::{
    DEFAULT_EXTENSION, DEFAULT_MAX_FILE_SIZE, DEFAULT_RESOLVE_TIMEOUT, MAX_SYMLINK_HOPS,
};
use crate::core::serde::duration_millis;
use crate::security::types::{CaseSensitivity, ExpectedKind, ExtensionRule};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Primary roots variable (comma-separated)
pub const ENV_ROOTS: &str = "SHEETGATE_ROOTS";
/// Legacy single-variable form accepted when `SHEETGATE_ROOTS` is unset
pub const ENV_LEGACY_DIRECTORY: &str = "DIRECTORY";
pub const ENV_CASE_INSENSITIVE: &str = "SHEETGATE_CASE_INSENSITIVE";
pub const ENV_BACKSLASH_SEPARATORS: &str = "SHEETGATE_BACKSLASH_SEPARATORS";
pub const ENV_MAX_SYMLINK_HOPS: &str = "SHEETGATE_MAX_SYMLINK_HOPS";
pub const ENV_RESOLVE_TIMEOUT_MS: &str = "SHEETGATE_RESOLVE_TIMEOUT_MS";
pub const ENV_DEFAULT_EXTENSION: &str = "SHEETGATE_DEFAULT_EXTENSION";
pub const ENV_EXTENSIONS: &str = "SHEETGATE_EXTENSIONS";
pub const ENV_MAX_FILE_SIZE: &str = "SHEETGATE_MAX_FILE_SIZE";

const PLACEHOLDER_OPEN: &str = "${user_config.";

/// Configuration result
#[must_use = "configuration errors are startup-fatal and must be handled"]
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum ConfigError {
    #[error("No allowed roots configured")]
    #[diagnostic(
        code(config::no_roots),
        help("Set SHEETGATE_ROOTS (or DIRECTORY) to one or more comma-separated directories.")
    )]
    NoRoots,

    #[error("Unresolved placeholder ${{user_config.{0}}}")]
    #[diagnostic(
        code(config::unresolved_placeholder),
        help("Export the upper-cased key as an environment variable.")
    )]
    UnresolvedPlaceholder(String),

    #[error("Unterminated placeholder in {0:?}")]
    #[diagnostic(code(config::malformed_placeholder))]
    MalformedPlaceholder(String),

    #[error("Invalid value for {key}: {value:?}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { key: String, value: String },

    #[error("File extension must start with '.': {0:?}")]
    #[diagnostic(
        code(config::invalid_extension),
        help("Write extensions with their leading dot, for example .xlsx")
    )]
    InvalidExtension(String),

    #[error("Default extension {0:?} is not among the accepted extensions")]
    #[diagnostic(code(config::default_not_accepted))]
    DefaultNotAccepted(String),

    #[error("Symlink hop limit must be at least 1")]
    #[diagnostic(code(config::invalid_hop_limit))]
    InvalidHopLimit,
}

/// Startup configuration for the gate and the guarded workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Raw root strings; canonicalized by the registry
    pub roots: Vec<String>,
    pub case_sensitivity: CaseSensitivity,
    /// Treat `\` as a separator on platforms where it is not one
    pub backslash_separators: bool,
    pub max_symlink_hops: usize,
    #[serde(with = "duration_millis")]
    pub resolve_timeout: Duration,
    /// Appended on create when the name lacks an accepted extension
    pub default_extension: Option<String>,
    pub allowed_extensions: Vec<String>,
    /// Largest file the guarded workspace will read, in bytes
    pub max_file_size: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            case_sensitivity: CaseSensitivity::Sensitive,
            backslash_separators: true,
            max_symlink_hops: MAX_SYMLINK_HOPS,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            default_extension: Some(DEFAULT_EXTENSION.to_string()),
            allowed_extensions: vec![DEFAULT_EXTENSION.to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl GateConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unset keys keep their defaults. Roots may be empty here; `validate`
    /// reports that, so callers can still add roots from the command line.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let raw_roots = lookup(ENV_ROOTS).or_else(|| lookup(ENV_LEGACY_DIRECTORY));
        if let Some(raw) = raw_roots {
            config.roots = split_list(&raw)
                .into_iter()
                .map(|root| expand_user_config(&root, &lookup))
                .collect::<ConfigResult<_>>()?;
        }

        if let Some(value) = lookup(ENV_CASE_INSENSITIVE) {
            if parse_flag(ENV_CASE_INSENSITIVE, &value)? {
                config.case_sensitivity = CaseSensitivity::Insensitive;
            }
        }
        if let Some(value) = lookup(ENV_BACKSLASH_SEPARATORS) {
            config.backslash_separators = parse_flag(ENV_BACKSLASH_SEPARATORS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_SYMLINK_HOPS) {
            config.max_symlink_hops = parse_number(ENV_MAX_SYMLINK_HOPS, &value)?;
        }
        if let Some(value) = lookup(ENV_RESOLVE_TIMEOUT_MS) {
            config.resolve_timeout =
                Duration::from_millis(parse_number(ENV_RESOLVE_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_DEFAULT_EXTENSION) {
            let trimmed = value.trim();
            config.default_extension = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(value) = lookup(ENV_EXTENSIONS) {
            config.allowed_extensions = split_list(&value);
        }
        if let Some(value) = lookup(ENV_MAX_FILE_SIZE) {
            config.max_file_size = parse_number(ENV_MAX_FILE_SIZE, &value)?;
        }

        debug!(roots = config.roots.len(), "Configuration loaded");
        Ok(config)
    }

    /// Replace the configured roots, typically from command-line flags
    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.case_sensitivity = case;
        self
    }

    /// Check everything that does not need the filesystem
    pub fn validate(&self) -> ConfigResult<()> {
        if self.roots.iter().all(|root| root.trim().is_empty()) {
            return Err(ConfigError::NoRoots);
        }
        if self.max_symlink_hops == 0 {
            return Err(ConfigError::InvalidHopLimit);
        }
        for ext in &self.allowed_extensions {
            check_extension(ext)?;
        }
        if let Some(default) = &self.default_extension {
            check_extension(default)?;
            let accepted = self
                .allowed_extensions
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(default));
            if !accepted {
                return Err(ConfigError::DefaultNotAccepted(default.clone()));
            }
        }
        Ok(())
    }

    /// Expected kind for workbook operations under this configuration
    pub fn spreadsheet_kind(&self) -> ExpectedKind {
        ExpectedKind::Extension(ExtensionRule::new(
            self.allowed_extensions.clone(),
            self.default_extension.clone(),
        ))
    }

    /// Log the effective configuration
    pub fn log_summary(&self) {
        info!(
            roots = ?self.roots,
            case = ?self.case_sensitivity,
            backslash_separators = self.backslash_separators,
            max_symlink_hops = self.max_symlink_hops,
            resolve_timeout_ms = self.resolve_timeout.as_millis() as u64,
            extensions = ?self.allowed_extensions,
            "Gate configuration"
        );
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Substitute every `${user_config.KEY}` with the variable named `KEY` upper-cased
///
/// A placeholder whose variable is unset or empty is an error rather than
/// silently becoming some other directory.
pub fn expand_user_config<F>(value: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER_OPEN.len()..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::MalformedPlaceholder(value.to_string()))?;
        let key = &after[..end];

        let resolved = lookup(&key.to_uppercase())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::UnresolvedPlaceholder(key.to_string()))?;
        info!(key = key, "Resolved user_config placeholder");
        expanded.push_str(&resolved);

        rest = &after[end + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn check_extension(ext: &str) -> ConfigResult<()> {
    let valid = ext.len() > 1
        && ext.starts_with('.')
        && !ext.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidExtension(ext.to_string()))
    }
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
