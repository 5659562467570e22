//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the production sources of the workspace:
//! - No sleep() calls in production code
//! - No blocking network or file I/O inside async functions
//!
//! The helpers here do the scanning; the rules live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["tcp-socket/core/src"];

/// Workspace root, derived from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// One line of production code
#[derive(Debug)]
pub struct SourceLine<'a> {
    /// File the line belongs to
    pub path: &'a Path,
    /// 1-based line number
    pub number: usize,
    /// Full line text
    pub text: &'a str,
    /// Line text with any `//` comment removed
    pub code: &'a str,
    /// Whether the enclosing function is `async`
    pub in_async_fn: bool,
}

/// Kind of function enclosing a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnclosingFn {
    /// `async fn`
    Async,
    /// Plain `fn`
    Sync,
    /// Not inside a function (module level)
    None,
}

/// All `.rs` files under the production directories
#[must_use]
pub fn production_files() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.exists(), "production directory missing: {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files
}

/// Read a file and return the lines that precede its `#[cfg(test)]` module
#[must_use]
pub fn read_production_source(path: &Path) -> String {
    let content = fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .take_while(|line| line.trim() != "#[cfg(test)]")
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run `check` over every production line of `source`
pub fn for_each_line<'a>(path: &'a Path, source: &'a str, mut check: impl FnMut(SourceLine<'a>)) {
    let lines: Vec<&str> = source.lines().collect();

    for (idx, text) in lines.iter().enumerate() {
        let code = text.split("//").next().unwrap_or(text);
        if code.trim().is_empty() {
            continue;
        }

        check(SourceLine {
            path,
            number: idx + 1,
            text,
            code,
            in_async_fn: enclosing_fn(&lines, idx) == EnclosingFn::Async,
        });
    }
}

/// Find the kind of function the line at `current_idx` sits in
///
/// Scans backwards for the nearest function signature, stopping at module
/// and impl boundaries.
#[must_use]
pub fn enclosing_fn(lines: &[&str], current_idx: usize) -> EnclosingFn {
    for i in (0..=current_idx).rev() {
        let line = lines[i].trim();
        let line = line.split("//").next().unwrap_or(line);

        if line.contains("async fn ") {
            return EnclosingFn::Async;
        }
        if line.starts_with("fn ") || line.contains(" fn ") {
            return EnclosingFn::Sync;
        }
        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return EnclosingFn::None;
        }
    }
    EnclosingFn::None
}

/// Format a violation message
#[must_use]
pub fn violation(line: &SourceLine<'_>, what: &str) -> String {
    format!(
        "{}:{} - {}: {}",
        line.path.display(),
        line.number,
        what,
        line.text.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let code = vec![
            "pub async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert_eq!(enclosing_fn(&code, 1), EnclosingFn::Async);
    }

    #[test]
    fn test_sync_function_detection() {
        let code = vec![
            "pub fn load() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert_eq!(enclosing_fn(&code, 1), EnclosingFn::Sync);
    }

    #[test]
    fn test_module_level_detection() {
        let code = vec!["use std::net::TcpStream;"];
        assert_eq!(enclosing_fn(&code, 0), EnclosingFn::None);
    }

    #[test]
    fn test_production_files_found() {
        let files = production_files();
        assert!(files.iter().any(|p| p.ends_with("registry.rs")));
    }
}
