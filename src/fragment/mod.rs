//! Mapping fragments and the per-pass merge session.
//!
//! A [`MappingFragment`] is a partial mapping document: either a hand-authored
//! file discovered on disk or a body synthesized from a template. Each fragment
//! carries a `merged` flag that flips from `false` to `true` at most once. The
//! flag is an atomic compare-and-set, so even a parallel merge pass can never
//! place one fragment into two documents.
//!
//! The [`MergeSession`] owns every fragment of one merge pass, indexed by
//! filename in discovery order, and is dropped when the pass ends. Filenames of
//! the form `<SimpleName>.xml` for the mappers of the pass are reserved: only
//! the mapper of that name may take them. The canonical fragment text always
//! lives on disk and is re-read on reload.

pub mod xml;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constants::{ATTR_NAMESPACE, NODE_MAPPER};
use crate::core::{MapperError, Result};

/// A partial mapping document.
#[derive(Debug)]
pub struct MappingFragment {
    filename: String,
    content: String,
    merged: AtomicBool,
    filepath: Option<PathBuf>,
}

impl MappingFragment {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            merged: AtomicBool::new(false),
            filepath: None,
        }
    }

    /// Read a fragment from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MapperError::io("read fragment", path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            filename,
            content,
            merged: AtomicBool::new(false),
            filepath: Some(path.to_path_buf()),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn is_merged(&self) -> bool {
        self.merged.load(Ordering::Acquire)
    }

    /// Claim the fragment. Returns `false` if it was already merged.
    pub fn try_mark_merged(&self) -> bool {
        self.merged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn root(&self) -> Result<xml::Element<'_>> {
        let root = xml::root(&self.content).map_err(|reason| MapperError::InvalidFragment {
            filename: self.filename.clone(),
            reason,
        })?;
        if root.name != NODE_MAPPER {
            return Err(MapperError::InvalidFragment {
                filename: self.filename.clone(),
                reason: format!("root element is <{}>, expected <{NODE_MAPPER}>", root.name),
            });
        }
        Ok(root)
    }

    /// The non-blank `namespace` attribute of the root element.
    pub fn namespace(&self) -> Result<String> {
        self.root()?
            .attr(ATTR_NAMESPACE)
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| MapperError::MissingNamespace {
                filename: self.filename.clone(),
            })
    }

    /// Everything between the root start tag and its end tag.
    pub fn inner_body(&self) -> Result<String> {
        Ok(self.root()?.inner_text().to_string())
    }
}

impl Clone for MappingFragment {
    fn clone(&self) -> Self {
        Self {
            filename: self.filename.clone(),
            content: self.content.clone(),
            merged: AtomicBool::new(self.is_merged()),
            filepath: self.filepath.clone(),
        }
    }
}

/// All fragments of one merge pass.
#[derive(Debug, Default)]
pub struct MergeSession {
    fragments: Vec<MappingFragment>,
    by_filename: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl MergeSession {
    /// Create a session; discovery order is kept. The first fragment with a
    /// given filename wins the filename index.
    pub fn new(fragments: Vec<MappingFragment>) -> Self {
        let mut by_filename = HashMap::with_capacity(fragments.len());
        for (index, fragment) in fragments.iter().enumerate() {
            by_filename.entry(fragment.filename.clone()).or_insert(index);
        }
        Self {
            fragments,
            by_filename,
            reserved: HashSet::new(),
        }
    }

    /// Reserve `filenames` for exact-filename claims.
    #[must_use]
    pub fn with_reserved_filenames<I, S>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(filenames.into_iter().map(Into::into));
        self
    }

    /// Whether `filename` belongs to a mapper by name.
    pub fn is_reserved(&self, filename: &str) -> bool {
        self.reserved.contains(filename)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, filename: &str) -> Option<&MappingFragment> {
        self.by_filename.get(filename).map(|&i| &self.fragments[i])
    }

    /// Every fragment in discovery order.
    pub fn fragments(&self) -> &[MappingFragment] {
        &self.fragments
    }

    /// Fragments not merged yet, in discovery order.
    pub fn unmerged(&self) -> impl Iterator<Item = &MappingFragment> {
        self.fragments.iter().filter(|f| !f.is_merged())
    }

    /// Files backing the fragments.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.fragments
            .iter()
            .filter_map(|f| f.filepath.clone())
            .collect()
    }

    /// End the pass, handing back what nobody claimed.
    pub fn into_leftovers(self) -> Vec<MappingFragment> {
        self.fragments.into_iter().filter(|f| !f.is_merged()).collect()
    }
}
