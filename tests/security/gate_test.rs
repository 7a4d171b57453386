/*!
 * Access Gate Integration Tests
 * Decisions against a real filesystem sandbox
 */

use pretty_assertions::assert_eq;
use sheetgate::config::GateConfig;
use sheetgate::security::sandbox::PathNormalizer;
use sheetgate::{
    AccessDecision, AccessGate, CaseSensitivity, DenialReason, ExpectedKind, Intent, PathRequest,
    RootRegistry,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Sandbox {
    _temp: TempDir,
    base: PathBuf,
    root: PathBuf,
    gate: AccessGate,
}

impl Sandbox {
    /// `<tmp>/excel` is the only allowed root; `<tmp>/outside` sits next to it
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let root = base.join("excel");
        fs::create_dir_all(root.join("reports/2024")).unwrap();
        fs::create_dir_all(base.join("outside")).unwrap();
        fs::write(root.join("reports/2024/q1.xlsx"), b"workbook").unwrap();
        fs::write(base.join("outside/secret.xlsx"), b"secret").unwrap();

        let registry =
            RootRegistry::initialize([root.display().to_string()], CaseSensitivity::Sensitive)
                .unwrap();
        Self {
            _temp: temp,
            base,
            root,
            gate: AccessGate::new(registry),
        }
    }

    fn check(&self, raw: &str, intent: Intent, kind: &ExpectedKind) -> AccessDecision {
        self.gate.check(&PathRequest::new(raw, intent), kind)
    }

    fn path_str(path: &Path) -> String {
        path.display().to_string()
    }
}

fn denied(reason: DenialReason) -> AccessDecision {
    AccessDecision::Denied(reason)
}

#[test]
fn test_descendant_is_approved_with_canonical_path() {
    let sandbox = Sandbox::new();
    let decision = sandbox.check("reports/./2024/../2024/q1.xlsx", Intent::Read, &ExpectedKind::Any);

    let resolved = decision.approved().expect("should be approved");
    assert_eq!(resolved.as_path(), sandbox.root.join("reports/2024/q1.xlsx"));
    assert_eq!(resolved.root(), sandbox.root.as_path());
}

#[test]
fn test_absolute_path_outside_is_denied() {
    let sandbox = Sandbox::new();
    let outside = Sandbox::path_str(&sandbox.base.join("outside/secret.xlsx"));
    assert_eq!(
        sandbox.check(&outside, Intent::Read, &ExpectedKind::Any),
        denied(DenialReason::OutsideSandbox)
    );
}

#[test]
fn test_sibling_with_shared_prefix_is_denied() {
    let sandbox = Sandbox::new();
    let evil = sandbox.base.join("excel-evil");
    fs::create_dir(&evil).unwrap();
    fs::write(evil.join("file.xlsx"), b"x").unwrap();

    let decision = sandbox.check(
        &Sandbox::path_str(&evil.join("file.xlsx")),
        Intent::Read,
        &ExpectedKind::Any,
    );
    assert_eq!(decision, denied(DenialReason::OutsideSandbox));
}

#[test]
fn test_dotdot_through_root_is_denied() {
    let sandbox = Sandbox::new();
    let raw = format!("{}/../outside/secret.xlsx", sandbox.root.display());
    assert_eq!(
        sandbox.check(&raw, Intent::Read, &ExpectedKind::Any),
        denied(DenialReason::OutsideSandbox)
    );
}

#[cfg(unix)]
#[test]
fn test_relative_escape_to_system_file_is_denied() {
    if !Path::new("/etc/passwd").exists() {
        return;
    }
    let sandbox = Sandbox::new();
    let raw = format!("{}etc/passwd", "../".repeat(32));
    assert_eq!(
        sandbox.check(&raw, Intent::Read, &ExpectedKind::Any),
        denied(DenialReason::OutsideSandbox)
    );
}

#[test]
fn test_denial_does_not_reveal_what_exists_outside() {
    let sandbox = Sandbox::new();
    let missing = Sandbox::path_str(&sandbox.base.join("nosuch/deep/file.xlsx"));
    let present = Sandbox::path_str(&sandbox.base.join("outside/secret.xlsx/deep"));

    let pairs = [
        ("../outside", "../nosuch", Intent::Read),
        ("../outside/x.xlsx", "../nosuchdir/x.xlsx", Intent::Write),
        ("../outside/x.xlsx", "../nosuchdir/x.xlsx", Intent::Create),
        ("../outside/../excel/reports", "../nosuch/../excel/reports", Intent::List),
        (present.as_str(), missing.as_str(), Intent::Read),
    ];
    for (existing, absent, intent) in pairs {
        assert_eq!(
            sandbox.check(existing, intent, &ExpectedKind::Any),
            denied(DenialReason::OutsideSandbox),
            "input {existing:?} intent {intent}"
        );
        assert_eq!(
            sandbox.check(absent, intent, &ExpectedKind::Any),
            denied(DenialReason::OutsideSandbox),
            "input {absent:?} intent {intent}"
        );
    }
}

#[test]
fn test_write_to_missing_file_in_existing_directory() {
    let sandbox = Sandbox::new();
    let decision = sandbox.check("reports/2024/q2.xlsx", Intent::Write, &ExpectedKind::spreadsheet());
    assert_eq!(
        decision.approved().map(|r| r.as_path().to_path_buf()),
        Some(sandbox.root.join("reports/2024/q2.xlsx"))
    );
}

#[test]
fn test_missing_leaf_rejected_for_read_delete_list() {
    let sandbox = Sandbox::new();
    for intent in [Intent::Read, Intent::Delete, Intent::List] {
        assert_eq!(
            sandbox.check("reports/2024/absent.xlsx", intent, &ExpectedKind::Any),
            denied(DenialReason::InvalidPath),
            "intent {intent}"
        );
    }
}

#[test]
fn test_missing_intermediate_is_invalid_even_for_create() {
    let sandbox = Sandbox::new();
    assert_eq!(
        sandbox.check("reports/2030/q1.xlsx", Intent::Create, &ExpectedKind::spreadsheet()),
        denied(DenialReason::InvalidPath)
    );
}

#[test]
fn test_malformed_input_is_invalid() {
    let sandbox = Sandbox::new();
    for raw in ["", "   ", "reports\0/q1.xlsx"] {
        assert_eq!(
            sandbox.check(raw, Intent::Read, &ExpectedKind::Any),
            denied(DenialReason::InvalidPath),
            "input {raw:?}"
        );
    }
}

#[test]
fn test_create_appends_default_extension() {
    let sandbox = Sandbox::new();
    let decision = sandbox.check("reports/jan", Intent::Create, &ExpectedKind::spreadsheet());

    let resolved = decision.approved().expect("create should be approved");
    assert_eq!(resolved.as_path(), sandbox.root.join("reports/jan.xlsx"));
    assert!(resolved.as_path().ends_with("reports/jan.xlsx"));
}

#[test]
fn test_wrong_extension_without_create_is_wrong_kind() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.root.join("notes.csv"), b"a,b").unwrap();
    assert_eq!(
        sandbox.check("notes.csv", Intent::Read, &ExpectedKind::spreadsheet()),
        denied(DenialReason::WrongKind)
    );
    assert_eq!(
        sandbox.check("reports", Intent::Read, &ExpectedKind::spreadsheet()),
        denied(DenialReason::WrongKind)
    );
}

#[test]
fn test_directory_kind() {
    let sandbox = Sandbox::new();
    assert!(sandbox.check("reports", Intent::List, &ExpectedKind::Directory).is_approved());
    assert_eq!(
        sandbox.check("reports/2024/q1.xlsx", Intent::List, &ExpectedKind::Directory),
        denied(DenialReason::WrongKind)
    );
}

#[test]
fn test_decisions_are_idempotent() {
    let sandbox = Sandbox::new();
    let inputs = ["reports/2024/q1.xlsx", "../outside/secret.xlsx", "reports/jan", ""];
    for raw in inputs {
        for intent in Intent::ALL {
            let first = sandbox.check(raw, intent, &ExpectedKind::spreadsheet());
            let second = sandbox.check(raw, intent, &ExpectedKind::spreadsheet());
            assert_eq!(first, second, "input {raw:?} intent {intent}");
        }
    }
}

#[test]
fn test_empty_registry_never_approves() {
    let gate = AccessGate::new(RootRegistry::empty());
    for intent in Intent::ALL {
        assert_eq!(
            gate.check(&PathRequest::new("q1.xlsx", intent), &ExpectedKind::Any),
            denied(DenialReason::RootRegistryUnavailable)
        );
    }
}

#[test]
fn test_vanished_root_denies_everything() {
    let sandbox = Sandbox::new();
    fs::remove_dir_all(&sandbox.root).unwrap();
    assert_eq!(
        sandbox.check("reports/2024/q1.xlsx", Intent::Read, &ExpectedKind::Any),
        denied(DenialReason::RootRegistryUnavailable)
    );
}

#[test]
fn test_second_root_is_reported() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    let first = base.join("first");
    let second = base.join("second");
    fs::create_dir(&first).unwrap();
    fs::create_dir(&second).unwrap();
    fs::write(second.join("b.xlsx"), b"x").unwrap();

    let registry = RootRegistry::initialize(
        [first.display().to_string(), second.display().to_string()],
        CaseSensitivity::Sensitive,
    )
    .unwrap();
    let gate = AccessGate::new(registry);

    let decision = gate.check(
        &PathRequest::read(second.join("b.xlsx").display().to_string()),
        &ExpectedKind::spreadsheet(),
    );
    assert_eq!(decision.approved().unwrap().root(), second.as_path());

    // Relative paths anchor at the first root only
    assert_eq!(
        gate.check(&PathRequest::read("b.xlsx"), &ExpectedKind::Any),
        denied(DenialReason::InvalidPath)
    );
}

#[cfg(unix)]
#[test]
fn test_backslash_separators_are_configurable() {
    let sandbox = Sandbox::new();
    assert!(sandbox
        .check(r"reports\2024\q1.xlsx", Intent::Read, &ExpectedKind::Any)
        .is_approved());

    let strict = sandbox.gate.clone().with_normalizer(PathNormalizer::new(false, 40));
    assert_eq!(
        strict.check(&PathRequest::read(r"reports\2024\q1.xlsx"), &ExpectedKind::Any),
        denied(DenialReason::InvalidPath)
    );
}

#[test]
fn test_gate_from_config() {
    let temp = TempDir::new().unwrap();
    let config = GateConfig::default()
        .with_roots([temp.path().display().to_string()])
        .with_case_sensitivity(CaseSensitivity::Insensitive);
    let gate = AccessGate::from_config(&config).unwrap();
    assert_eq!(gate.registry().len(), 1);
    assert_eq!(gate.resolve_timeout(), config.resolve_timeout);

    let missing = GateConfig::default().with_roots([temp.path().join("gone").display().to_string()]);
    assert!(AccessGate::from_config(&missing).is_err());
}

#[cfg(target_os = "linux")]
#[test]
fn test_case_insensitive_containment() {
    let sandbox = Sandbox::new();
    let upper = sandbox.base.join("EXCEL");
    fs::create_dir(&upper).unwrap();
    fs::write(upper.join("q1.xlsx"), b"x").unwrap();
    let raw = Sandbox::path_str(&upper.join("q1.xlsx"));

    assert_eq!(
        sandbox.check(&raw, Intent::Read, &ExpectedKind::Any),
        denied(DenialReason::OutsideSandbox)
    );

    let folding = sandbox.gate.clone().with_case_sensitivity(CaseSensitivity::Insensitive);
    assert!(folding.check(&PathRequest::read(raw), &ExpectedKind::Any).is_approved());
}

#[cfg(unix)]
mod symlinks {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::symlink;

    #[test]
    fn test_link_inside_pointing_outside_is_denied() {
        let sandbox = Sandbox::new();
        symlink(sandbox.base.join("outside"), sandbox.root.join("escape")).unwrap();

        assert_eq!(
            sandbox.check("escape/secret.xlsx", Intent::Read, &ExpectedKind::Any),
            denied(DenialReason::OutsideSandbox)
        );
        assert_eq!(
            sandbox.check("escape/new.xlsx", Intent::Create, &ExpectedKind::spreadsheet()),
            denied(DenialReason::OutsideSandbox)
        );
    }

    #[test]
    fn test_link_inside_pointing_inside_is_approved() {
        let sandbox = Sandbox::new();
        symlink(sandbox.root.join("reports"), sandbox.root.join("latest")).unwrap();

        let decision = sandbox.check("latest/2024/q1.xlsx", Intent::Read, &ExpectedKind::Any);
        assert_eq!(
            decision.approved().unwrap().as_path(),
            sandbox.root.join("reports/2024/q1.xlsx")
        );
    }

    #[test]
    fn test_planted_leaf_link_redirecting_write_is_denied() {
        let sandbox = Sandbox::new();
        symlink(
            sandbox.base.join("outside/planted.xlsx"),
            sandbox.root.join("reports/q3.xlsx"),
        )
        .unwrap();

        assert_eq!(
            sandbox.check("reports/q3.xlsx", Intent::Write, &ExpectedKind::spreadsheet()),
            denied(DenialReason::OutsideSandbox)
        );
    }

    #[test]
    fn test_renamed_leaf_is_rechecked() {
        let sandbox = Sandbox::new();
        symlink(
            sandbox.base.join("outside/secret.xlsx"),
            sandbox.root.join("reports/feb.xlsx"),
        )
        .unwrap();

        assert_eq!(
            sandbox.check("reports/feb", Intent::Create, &ExpectedKind::spreadsheet()),
            denied(DenialReason::OutsideSandbox)
        );
    }

    #[test]
    fn test_links_to_missing_outside_targets_are_outside() {
        let sandbox = Sandbox::new();
        symlink(sandbox.base.join("outside"), sandbox.root.join("escape")).unwrap();
        symlink(sandbox.base.join("gone"), sandbox.root.join("dangling")).unwrap();

        for raw in ["escape/absent.xlsx", "dangling/absent.xlsx", "dangling"] {
            assert_eq!(
                sandbox.check(raw, Intent::Read, &ExpectedKind::Any),
                denied(DenialReason::OutsideSandbox),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_create_appends_extension_to_the_supplied_name() {
        let sandbox = Sandbox::new();
        fs::write(sandbox.root.join("reports/other.txt"), b"notes").unwrap();
        symlink(
            sandbox.root.join("reports/other.txt"),
            sandbox.root.join("reports/jan"),
        )
        .unwrap();

        let decision = sandbox.check("reports/jan", Intent::Create, &ExpectedKind::spreadsheet());
        assert_eq!(
            decision.approved().map(|r| r.as_path().to_path_buf()),
            Some(sandbox.root.join("reports/jan.xlsx"))
        );
    }

    #[test]
    fn test_symlink_cycle_is_invalid() {
        let sandbox = Sandbox::new();
        symlink(sandbox.root.join("loop_b"), sandbox.root.join("loop_a")).unwrap();
        symlink(sandbox.root.join("loop_a"), sandbox.root.join("loop_b")).unwrap();

        assert_eq!(
            sandbox.check("loop_a/q1.xlsx", Intent::Create, &ExpectedKind::Any),
            denied(DenialReason::InvalidPath)
        );
    }

    #[test]
    fn test_symlinked_root_is_canonicalized() {
        let sandbox = Sandbox::new();
        let alias = sandbox.base.join("alias");
        symlink(&sandbox.root, &alias).unwrap();

        let registry =
            RootRegistry::initialize([alias.display().to_string()], CaseSensitivity::Sensitive)
                .unwrap();
        assert_eq!(registry.roots(), &[sandbox.root.clone()]);

        let gate = AccessGate::new(registry);
        let raw = format!("{}/reports/2024/q1.xlsx", alias.display());
        assert_eq!(
            gate.check(&PathRequest::read(raw), &ExpectedKind::Any)
                .approved()
                .unwrap()
                .as_path(),
            sandbox.root.join("reports/2024/q1.xlsx")
        );
    }
}
