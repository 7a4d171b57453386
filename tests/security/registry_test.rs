/*!
 * Root Registry Integration Tests
 */

use sheetgate::{CaseSensitivity, RegistryError, RootRegistry};
use std::fs;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_multiple_roots_keep_order() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    for name in ["b", "a", "c"] {
        fs::create_dir(base.join(name)).unwrap();
    }

    let raw: Vec<String> = ["b", "a", "c"]
        .iter()
        .map(|n| base.join(n).display().to_string())
        .collect();
    let registry = RootRegistry::initialize(&raw, CaseSensitivity::Sensitive).unwrap();

    assert_eq!(
        registry.roots(),
        &[base.join("b"), base.join("a"), base.join("c")]
    );
    assert_eq!(registry.primary(), Some(base.join("b").as_path()));
}

#[test]
fn test_whitespace_around_roots_is_ignored() {
    let temp = TempDir::new().unwrap();
    let raw = format!("  {}  ", temp.path().display());
    let registry = RootRegistry::initialize([raw], CaseSensitivity::Sensitive).unwrap();
    assert_eq!(registry.roots(), &[temp.path().canonicalize().unwrap()]);
}

#[test]
fn test_nul_byte_root_is_invalid() {
    assert!(matches!(
        RootRegistry::initialize(["/tmp\0evil"], CaseSensitivity::Sensitive),
        Err(RegistryError::InvalidRoot(_))
    ));
}

#[cfg(target_os = "linux")]
#[test]
fn test_case_insensitive_duplicates_collapse() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    fs::create_dir(base.join("Books")).unwrap();
    fs::create_dir(base.join("books")).unwrap();
    let raw = [
        base.join("Books").display().to_string(),
        base.join("books").display().to_string(),
    ];

    let sensitive = RootRegistry::initialize(&raw, CaseSensitivity::Sensitive).unwrap();
    assert_eq!(sensitive.len(), 2);

    let insensitive = RootRegistry::initialize(&raw, CaseSensitivity::Insensitive).unwrap();
    assert_eq!(insensitive.roots(), &[base.join("Books")]);
}

#[test]
fn test_clones_share_roots_across_threads() {
    let temp = TempDir::new().unwrap();
    let registry =
        RootRegistry::initialize([temp.path().display().to_string()], CaseSensitivity::Sensitive)
            .unwrap();
    let expected = registry.roots().to_vec();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || registry.roots().to_vec())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_registry_errors_render_codes() {
    use miette::Diagnostic;

    let err = RegistryError::MissingRoot("/srv/excel".into());
    assert_eq!(err.code().unwrap().to_string(), "registry::missing_root");
    assert!(err.to_string().contains("/srv/excel"));
}
