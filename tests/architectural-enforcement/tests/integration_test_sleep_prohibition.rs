//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Reads wait on the
//! socket with a deadline (`tokio::time::timeout`), never by polling.

use architectural_enforcement::{
    for_each_line, production_files, read_production_source, violation,
};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n✅ ACCEPTABLE waiting:");
        eprintln!("  - tokio::time::timeout around an I/O future");
        eprintln!("  - watch/Notify channels for close signalling");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all sleep() calls in production code
fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for path in production_files() {
        let source = read_production_source(&path);
        for_each_line(&path, &source, |line| {
            if line.code.contains("::sleep(") || line.code.contains(".sleep(") {
                violations.push(violation(&line, "Sleep call"));
            }
        });
    }

    violations
}
