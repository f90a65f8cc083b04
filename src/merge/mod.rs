//! Document merge engine.
//!
//! Combines a rendered document body with the hand-authored fragments that
//! belong to the same mapper. The body carries an `<!--_ext_mapper_-->` token
//! marking where fragment statements go. For one mapper the engine:
//!
//! 1. takes the fragment named exactly `<SimpleName>.xml`, if unmerged;
//! 2. scans every other unmerged fragment in discovery order and takes those
//!    whose namespace equals the mapper's. Fragments whose filename is reserved
//!    for another mapper (see [`MergeSession::with_reserved_filenames`]) are left
//!    to that mapper. A fragment without a namespace aborts the merge with
//!    [`MapperError::MissingNamespace`];
//! 3. replaces the token with the collected inner bodies, filename match first.
//!
//! Every taken fragment is claimed through its merged flag, so no fragment ends
//! up in two documents.

use crate::constants::{EXT_MAPPER_PLACEHOLDER, XML_SUFFIX};
use crate::core::{MapperError, Result};
use crate::fragment::{MappingFragment, MergeSession};

/// Result of merging one mapper's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBody {
    pub body: String,
    /// Filenames of the fragments merged in, in merge order.
    pub merged: Vec<String>,
}

/// Merge hand-authored fragments into `rendered_body`.
pub fn merge(
    namespace: &str,
    simple_name: &str,
    rendered_body: &str,
    session: &MergeSession,
) -> Result<MergedBody> {
    let mut parts = Vec::new();
    let mut merged = Vec::new();

    let exact = format!("{simple_name}{XML_SUFFIX}");
    if let Some(fragment) = session.get(&exact) {
        claim(fragment, &mut parts, &mut merged)?;
    }

    for fragment in session.fragments() {
        if fragment.is_merged() || session.is_reserved(fragment.filename()) {
            continue;
        }
        if fragment.namespace()? == namespace {
            claim(fragment, &mut parts, &mut merged)?;
        }
    }

    if !parts.is_empty() && !rendered_body.contains(EXT_MAPPER_PLACEHOLDER) {
        return Err(MapperError::TemplateRender {
            namespace: namespace.to_string(),
            message: format!(
                "rendered document lacks the {EXT_MAPPER_PLACEHOLDER} token needed to merge {}",
                merged.join(", ")
            ),
        });
    }

    if !merged.is_empty() {
        tracing::debug!("Merged {} into {namespace}", merged.join(", "));
    }
    Ok(MergedBody {
        body: rendered_body.replacen(EXT_MAPPER_PLACEHOLDER, &parts.join("\n"), 1),
        merged,
    })
}

/// Take a fragment unless it was merged already (possibly by another thread).
fn claim(fragment: &MappingFragment, parts: &mut Vec<String>, merged: &mut Vec<String>) -> Result<()> {
    if fragment.is_merged() {
        return Ok(());
    }
    let body = fragment.inner_body()?;
    if fragment.try_mark_merged() {
        parts.push(body);
        merged.push(fragment.filename().to_string());
    }
    Ok(())
}
