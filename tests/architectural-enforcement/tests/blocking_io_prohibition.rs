//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Socket operations run on the async runtime. Production code MUST
//! NOT use blocking network I/O anywhere, and MUST NOT use blocking file I/O
//! inside async functions.
//! **Required**: `tokio::net` for sockets. Synchronous helpers that run before
//! the runtime (config loading) may use `std::fs`.

use architectural_enforcement::{
    for_each_line, production_files, read_production_source, violation,
};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener (anywhere)");
        eprintln!("  - std::io::Read, std::io::Write on sockets");
        eprintln!("  - std::fs::* inside async fn");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::net::TcpStream::connect().await");
        eprintln!("  - tokio::io::AsyncReadExt, tokio::io::AsyncWriteExt");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for path in production_files() {
        let source = read_production_source(&path);
        for_each_line(&path, &source, |line| {
            if line.code.contains("std::net") {
                violations.push(violation(&line, "Blocking network I/O"));
            }

            if line.code.contains("std::io::Read") || line.code.contains("std::io::Write") {
                violations.push(violation(&line, "Blocking stream traits"));
            }

            if line.in_async_fn && line.code.contains("std::fs::") {
                violations.push(violation(&line, "Blocking file I/O in async fn"));
            }
        });
    }

    violations
}
