//! Meta-tests that verify test suite integrity
//!
//! These tests ensure that:
//! - E2E test files exist
//! - No tests are ignored

use std::path::Path;

const E2E_FILES: [&str; 6] = [
    "e2e_window.rs",
    "e2e_loop.rs",
    "e2e_countdown.rs",
    "e2e_persistence.rs",
    "e2e_session.rs",
    "e2e_driver.rs",
];

/// Verify E2E test files exist and are not empty
#[test]
fn e2e_tests_exist() {
    for file in E2E_FILES {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join(file);

        assert!(
            path.exists(),
            "Missing E2E test file: {}. All E2E tests must be present.",
            file
        );

        let metadata = std::fs::metadata(&path).expect("Failed to get file metadata");
        assert!(
            metadata.len() > 100,
            "E2E test file {} appears to be empty or too small ({} bytes)",
            file,
            metadata.len()
        );
    }
}

/// Verify no test in the workspace carries the ignore attribute
///
/// Ignored tests can hide regressions. All tests must run.
#[test]
fn no_ignored_tests() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut offenders = Vec::new();
    for dir in ["tests", "src", "crates/practiceloop-core/src"] {
        collect_ignored(&root.join(dir), &mut offenders);
    }

    assert!(
        offenders.is_empty(),
        "Found ignored tests - all tests must run.\nFiles:\n{}",
        offenders.join("\n")
    );
}

fn collect_ignored(dir: &Path, offenders: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_ignored(&path, offenders);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let source = std::fs::read_to_string(&path).unwrap_or_default();
            // Split so this file does not match itself
            let marker = concat!("#[", "ignore");
            if source.contains(marker) {
                offenders.push(path.display().to_string());
            }
        }
    }
}
