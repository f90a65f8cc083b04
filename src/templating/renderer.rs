//! Template rendering engine with Tera.
//!
//! Rendering is a single pass over a one-off template: no includes, no template
//! inheritance and no shared state between calls, so the same context and template
//! always produce byte-identical output.

use regex::Regex;
use std::sync::LazyLock;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::context::RenderContext;
use crate::core::{MapperError, Result};

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

static VARIABLE_NOT_FOUND: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Variable `([^`]+)` not found").ok());

/// Renders dialect templates into mapping document bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub const fn new() -> Self {
        Self
    }

    /// Render `template` for the mapper described by `context`.
    pub fn render(&self, template: &str, context: &RenderContext) -> Result<String> {
        let tera_context = context.to_tera()?;
        self.render_str(template, &tera_context, &context.context.namespace)
    }

    /// Render an arbitrary template against a prepared Tera context.
    pub fn render_str(&self, template: &str, context: &TeraContext, namespace: &str) -> Result<String> {
        tracing::trace!("Rendering template for {namespace}");

        // fresh instance per render keeps rendering free of shared state
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.render_str(template, context).map_err(|e| MapperError::TemplateRender {
            namespace: namespace.to_string(),
            message: Self::describe_error(&e, context),
        })
    }

    /// Turn a Tera error into one message, adding "did you mean" hints for
    /// unknown variables.
    fn describe_error(error: &tera::Error, context: &TeraContext) -> String {
        let message = Self::format_tera_error(error);
        let Some(variable) = VARIABLE_NOT_FOUND
            .as_ref()
            .and_then(|re| re.captures(&message))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            return message;
        };

        let available = Self::available_variables(context);
        let suggestions = Self::find_similar_variables(&variable, &available);
        if suggestions.is_empty() {
            message
        } else {
            format!("{message} (did you mean: {}?)", suggestions.join(", "))
        }
    }

    /// Dotted paths of the top two levels of the context.
    fn available_variables(context: &TeraContext) -> Vec<String> {
        let mut vars = Vec::new();
        if let serde_json::Value::Object(root) = context.clone().into_json() {
            for (key, value) in root {
                if let serde_json::Value::Object(fields) = &value {
                    vars.extend(fields.keys().map(|field| format!("{key}.{field}")));
                }
                vars.push(key);
            }
        }
        vars
    }

    /// Find similar variable names using Levenshtein distance
    fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
        let mut scored: Vec<_> = available
            .iter()
            .map(|var| (var.clone(), levenshtein(target, var)))
            .collect();
        scored.sort_by_key(|(_, dist)| *dist);

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(var, _)| var)
            .collect()
    }

    /// Walk the error chain, dropping Tera's internal one-off template name.
    pub fn format_tera_error(error: &tera::Error) -> String {
        use std::error::Error;

        let mut all_messages = vec![error.to_string()];
        let mut current: Option<&dyn Error> = error.source();
        while let Some(err) = current {
            all_messages.push(err.to_string());
            current = err.source();
        }

        let messages: Vec<String> = all_messages
            .into_iter()
            .map(|msg| {
                msg.replace("while rendering '__tera_one_off'", "")
                    .replace("Failed to render '__tera_one_off'", "Template rendering failed")
                    .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                    .replace("'__tera_one_off'", "template")
                    .trim()
                    .to_string()
            })
            .filter(|msg| {
                !msg.is_empty() && msg != "Template rendering failed" && msg != "Template syntax error"
            })
            .collect();

        if messages.is_empty() {
            "Template syntax error".to_string()
        } else {
            messages.join(": ")
        }
    }
}
