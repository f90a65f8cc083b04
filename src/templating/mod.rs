//! Dialect template rendering.
//!
//! A mapping document body is produced by evaluating the dialect template (see
//! [`Dialect`]) against a [`RenderContext`] built from entity metadata. When a
//! global template is configured, its text is spliced into the dialect template
//! at the `<!--_global_tpl_-->` token before evaluation. The splice is a plain
//! string substitution, not a document merge.
//!
//! Rendered bodies keep the `<!--_ext_mapper_-->` token; the merge engine later
//! replaces it with hand-authored statements.

pub mod context;
pub mod dialect;
pub mod renderer;

pub use context::{ColumnView, RenderContext};
pub use dialect::{Dialect, ResolvedTemplate, resolve_template, splice_global};
pub use renderer::TemplateRenderer;
