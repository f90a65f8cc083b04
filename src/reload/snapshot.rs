//! File snapshots of the watched directories.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::constants::XML_SUFFIX;
use crate::core::{MapperError, Result};

/// What happened to a watched file between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
    checksum: String,
}

/// State of every `*.xml` file directly inside the watched directories.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, FileStamp>,
}

impl Snapshot {
    /// Scan `dirs`, re-hashing only files whose modification time or length
    /// differs from `previous`. A directory that does not exist contributes no
    /// files.
    pub fn scan(dirs: &[PathBuf], previous: &Snapshot) -> Result<Self> {
        let mut files = BTreeMap::new();
        for dir in dirs {
            for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => continue,
                    Err(e) => {
                        return Err(MapperError::ConfigError {
                            message: format!("Cannot watch {}: {e}", dir.display()),
                        });
                    }
                };
                let path = entry.path();
                if !entry.file_type().is_file() || !is_xml(path) {
                    continue;
                }
                // the file may vanish between listing and reading
                let Ok(meta) = entry.metadata() else { continue };
                let modified = meta.modified().ok();
                let len = meta.len();

                let checksum = match previous.files.get(path) {
                    Some(old) if old.modified == modified && old.len == len => old.checksum.clone(),
                    _ => match compute_checksum(path) {
                        Ok(sum) => sum,
                        Err(_) => continue,
                    },
                };
                files.insert(
                    path.to_path_buf(),
                    FileStamp {
                        modified,
                        len,
                        checksum,
                    },
                );
            }
        }
        Ok(Self { files })
    }

    /// Changes that turn `self` into `next`. Files whose stamp changed but
    /// whose content hashes the same are not reported.
    pub fn diff(&self, next: &Snapshot) -> Vec<FileChange> {
        let mut changes = Vec::new();
        for (path, stamp) in &next.files {
            match self.files.get(path) {
                None => changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Created,
                }),
                Some(old) if old.checksum != stamp.checksum => changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Modified,
                }),
                Some(_) => {}
            }
        }
        for path in self.files.keys().filter(|p| !next.files.contains_key(*p)) {
            changes.push(FileChange {
                path: path.clone(),
                kind: ChangeKind::Removed,
            });
        }
        changes
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// SHA-256 of a file's bytes as `sha256:<hex>`.
pub fn compute_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| MapperError::io("checksum", path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

fn is_xml(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(XML_SUFFIX))
}
