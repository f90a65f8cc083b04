//! Glob-based discovery of hand-authored mapper fragments.
//!
//! Fragment locations are configured as glob patterns relative to the project
//! root (`mapper_locations`). Patterns support the usual syntax:
//!
//! - `*` matches any sequence of characters within a path component
//! - `**` matches any sequence of path components
//! - `?` matches any single character
//! - `[abc]` / `[a-z]` match a character set or range
//!
//! # Security
//!
//! Patterns containing `..` or absolute paths are rejected, and symlinks are not
//! followed during traversal, so discovery never leaves the project root.

use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::{MapperError, Result};

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
    original_pattern: String,
}

impl PatternMatcher {
    /// Compile a glob pattern.
    pub fn new(pattern_str: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern_str).map_err(|e| MapperError::ConfigError {
            message: format!("Invalid glob pattern '{pattern_str}': {e}"),
        })?;

        Ok(Self {
            pattern,
            original_pattern: pattern_str.to_string(),
        })
    }

    /// Find all files under `base_path` whose relative path matches.
    ///
    /// Returns relative paths. A missing base directory yields no matches.
    pub fn find_matches(&self, base_path: &Path) -> Result<Vec<PathBuf>> {
        debug!("Searching for pattern '{}' in {:?}", self.original_pattern, base_path);

        if !base_path.exists() {
            return Ok(Vec::new());
        }
        let base_path = base_path
            .canonicalize()
            .map_err(|e| MapperError::io("canonicalize", base_path, e))?;

        let mut matches = Vec::new();
        for entry in WalkDir::new(&base_path)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if let Ok(relative_path) = entry.path().strip_prefix(&base_path) {
                let relative_str = relative_path.to_string_lossy();
                trace!("Checking path: {}", relative_str);

                if self.pattern.matches(&relative_str) {
                    matches.push(relative_path.to_path_buf());
                }
            }
        }

        debug!("Found {} matches for pattern '{}'", matches.len(), self.original_pattern);
        Ok(matches)
    }

    /// Check a single path without touching the file system.
    pub fn matches(&self, path: &Path) -> bool {
        self.pattern.matches(&path.to_string_lossy())
    }

    pub fn pattern(&self) -> &str {
        &self.original_pattern
    }
}

/// Resolve several patterns into a sorted, de-duplicated list of absolute paths.
pub fn discover_files(patterns: &[String], base_path: &Path) -> Result<Vec<PathBuf>> {
    let mut all_matches = BTreeSet::new();

    for pattern in patterns {
        validate_pattern_safety(pattern)?;
        let matcher = PatternMatcher::new(pattern)?;
        all_matches.extend(
            matcher
                .find_matches(base_path)?
                .into_iter()
                .map(|relative| base_path.join(relative)),
        );
    }

    Ok(all_matches.into_iter().collect())
}

/// Reject patterns that could escape the project root.
pub fn validate_pattern_safety(pattern: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(MapperError::ConfigError {
            message: format!("Pattern contains {reason}: {pattern}"),
        })
    };

    if pattern.contains("..") {
        return reject("path traversal (..)");
    }
    if cfg!(unix) && pattern.starts_with('/') {
        return reject("absolute path");
    }
    if cfg!(windows) && (pattern.contains(':') || pattern.starts_with('\\')) {
        return reject("absolute path");
    }

    Ok(())
}
