/*!
 * Access Gate
 * Single checkpoint in front of every file-touching operation
 *
 * Stages run in a fixed order and short-circuit:
 * registry availability, normalization, containment, kind.
 * Every outcome, including filesystem trouble, becomes one AccessDecision.
 */

use super::kind::{KindEnforcer, KindOutcome};
use super::normalizer::{LeafEntry, PathNormalizer, Resolution, ResolveError};
use super::registry::RootRegistry;
use super::validator::SandboxValidator;
use crate::config::GateConfig;
use crate::core::limits::DEFAULT_RESOLVE_TIMEOUT;
use crate::security::traits::PathGuard;
use crate::security::types::*;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Composes normalizer, validator and kind enforcer over an immutable registry
///
/// Holds no per-call state; clones share the registry.
#[derive(Debug, Clone)]
pub struct AccessGate {
    registry: RootRegistry,
    normalizer: PathNormalizer,
    validator: SandboxValidator,
    enforcer: KindEnforcer,
    resolve_timeout: Duration,
}

impl AccessGate {
    pub fn new(registry: RootRegistry) -> Self {
        Self {
            registry,
            normalizer: PathNormalizer::default(),
            validator: SandboxValidator::default(),
            enforcer: KindEnforcer::new(),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// Build the registry and gate from startup configuration
    pub fn from_config(config: &GateConfig) -> RegistryResult<Self> {
        let registry = RootRegistry::initialize(&config.roots, config.case_sensitivity)?;
        Ok(Self::new(registry)
            .with_normalizer(PathNormalizer::new(
                config.backslash_separators,
                config.max_symlink_hops,
            ))
            .with_case_sensitivity(config.case_sensitivity)
            .with_resolve_timeout(config.resolve_timeout))
    }

    pub fn with_normalizer(mut self, normalizer: PathNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.validator = SandboxValidator::new(case);
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &RootRegistry {
        &self.registry
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    /// Decide a single request
    ///
    /// Never panics and never returns an error: expected failures are
    /// `Denied`, unexpected OS errors are `Denied(IoFailure)`.
    #[must_use]
    pub fn check(&self, request: &PathRequest, kind: &ExpectedKind) -> AccessDecision {
        let decision = match self.evaluate(request, kind) {
            Ok(resolved) => AccessDecision::Approved(resolved),
            Err(reason) => AccessDecision::Denied(reason),
        };

        match &decision {
            AccessDecision::Approved(resolved) => debug!(
                intent = %request.intent(),
                raw = request.raw(),
                resolved = %resolved.as_path().display(),
                "Path approved"
            ),
            AccessDecision::Denied(reason) => warn!(
                intent = %request.intent(),
                raw = request.raw(),
                reason = reason.code(),
                "Path denied"
            ),
        }

        decision
    }

    /// Decide a request off the async scheduler, bounded by the resolve timeout
    ///
    /// Resolution blocks on filesystem calls, so it runs on the blocking
    /// pool. A timeout or a panicked worker is reported as `IoFailure`.
    pub async fn check_async(&self, request: PathRequest, kind: ExpectedKind) -> AccessDecision {
        authorize_blocking(self.clone(), request, kind, self.resolve_timeout).await
    }

    fn evaluate(&self, request: &PathRequest, kind: &ExpectedKind) -> Result<ResolvedPath, DenialReason> {
        let base = self
            .registry
            .primary()
            .ok_or(DenialReason::RootRegistryUnavailable)?;
        if !self.registry.verify_available() {
            return Err(DenialReason::RootRegistryUnavailable);
        }

        let intent = request.intent();
        let Resolution { canonical, leaf } = self
            .normalizer
            .locate(request.raw(), base, intent.allows_missing_leaf(), |path: &Path| {
                self.on_route(path)
            })
            .map_err(resolve_denial)?;
        let root = self.contain(&canonical)?;

        let supplied = leaf.as_ref().map(|entry| entry.name.as_os_str());
        match self.enforce(&canonical, supplied, intent, kind)? {
            KindOutcome::Accepted => Ok(ResolvedPath::new(canonical, root, intent)),
            KindOutcome::Rejected => Err(DenialReason::WrongKind),
            KindOutcome::Transformed(renamed) => {
                let Some(LeafEntry { dir, .. }) = leaf else {
                    return Err(DenialReason::WrongKind);
                };
                self.settle_renamed(&dir, &renamed, intent, kind)
            }
        }
    }

    /// Resolve a renamed leaf in the directory the caller named and check
    /// it from scratch
    ///
    /// The new leaf may itself be an existing link, so containment and kind
    /// are both re-run; anything short of a plain acceptance is `WrongKind`.
    fn settle_renamed(
        &self,
        dir: &Path,
        renamed: &OsStr,
        intent: Intent,
        kind: &ExpectedKind,
    ) -> Result<ResolvedPath, DenialReason> {
        let canonical = self
            .normalizer
            .resolve_child(dir, renamed, intent.allows_missing_leaf(), |path: &Path| {
                self.on_route(path)
            })
            .map_err(resolve_denial)?
            .canonical;
        let root = self.contain(&canonical)?;

        match self.enforce(&canonical, Some(renamed), intent, kind)? {
            KindOutcome::Accepted => Ok(ResolvedPath::new(canonical, root, intent)),
            KindOutcome::Transformed(_) | KindOutcome::Rejected => Err(DenialReason::WrongKind),
        }
    }

    fn on_route(&self, path: &Path) -> bool {
        self.validator.on_route(path, self.registry.roots())
    }

    fn contain(&self, canonical: &Path) -> Result<PathBuf, DenialReason> {
        self.validator
            .containing_root(canonical, self.registry.roots())
            .map(Path::to_path_buf)
            .ok_or(DenialReason::OutsideSandbox)
    }

    fn enforce(
        &self,
        canonical: &Path,
        supplied: Option<&OsStr>,
        intent: Intent,
        kind: &ExpectedKind,
    ) -> Result<KindOutcome, DenialReason> {
        self.enforcer
            .enforce(canonical, supplied, intent, kind)
            .map_err(|e| io_denial(&e))
    }
}

/// Run a guard's decision on the blocking pool, bounded by `timeout`
///
/// A timeout or a failed worker is `Denied(IoFailure)`. A timed-out worker
/// keeps running in the background and its decision is dropped.
pub async fn authorize_blocking<G>(
    guard: G,
    request: PathRequest,
    kind: ExpectedKind,
    timeout: Duration,
) -> AccessDecision
where
    G: PathGuard + 'static,
{
    let task = tokio::task::spawn_blocking(move || guard.authorize(&request, &kind));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) => {
            error!(error = %e, "Path resolution task failed");
            AccessDecision::Denied(DenialReason::IoFailure)
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Path resolution timed out");
            AccessDecision::Denied(DenialReason::IoFailure)
        }
    }
}

impl PathGuard for AccessGate {
    fn authorize(&self, request: &PathRequest, kind: &ExpectedKind) -> AccessDecision {
        self.check(request, kind)
    }
}

fn resolve_denial(e: ResolveError) -> DenialReason {
    debug!(detail = %e, "Path resolution failed");
    e.reason()
}

fn io_denial(e: &io::Error) -> DenialReason {
    debug!(kind = ?e.kind(), "Kind check could not inspect path");
    DenialReason::IoFailure
}
