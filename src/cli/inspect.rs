//! `seedmap inspect`: show what one namespace ended up with.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use super::CliConfig;
use crate::core::ErrorContext;
use crate::document::{DocumentOrigin, PrimaryKeyInfo};
use crate::metadata::{MetadataExtractor, StatementKind};
use crate::registry::MappedStatement;
use crate::runtime::SeedMapper;

#[derive(Args)]
pub struct InspectCommand {
    /// Namespace to inspect, e.g. `demo.OrderMapper`
    pub namespace: String,

    /// List the registered statements instead of printing the document
    #[arg(long)]
    pub statements: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct InspectReport<'a> {
    namespace: &'a str,
    resource: &'a str,
    origin: DocumentOrigin,
    primary_key: Option<&'a PrimaryKeyInfo>,
    statements: Vec<&'a MappedStatement>,
    /// Sample values the fill handlers supply on insert, by column
    insert_fills: BTreeMap<String, serde_json::Value>,
    /// Sample values the fill handlers supply on update, by column
    update_fills: BTreeMap<String, serde_json::Value>,
}

impl InspectCommand {
    pub fn execute(self, cli: &CliConfig) -> Result<()> {
        let project = cli.load_project(|_| {})?;
        let mapper = SeedMapper::from_project(project)?;
        let documents = mapper.documents();

        let Some(doc) = documents.document(&self.namespace) else {
            let mut context = ErrorContext::new(format!("No document for namespace '{}'", self.namespace));
            if let Some(closest) = closest_namespace(&self.namespace, &documents.namespaces()) {
                context = context.with_suggestion(format!("Did you mean '{closest}'?"));
            }
            return Err(context.into());
        };

        let state = mapper.registry().snapshot();
        let statements: Vec<&MappedStatement> = state.statements_in(&self.namespace).collect();
        let project = mapper.project();
        let decl = project.model.mappers().iter().find(|m| m.namespace == self.namespace);
        let primary_key = decl
            .and_then(|m| m.entity.as_deref())
            .and_then(|entity| state.primary_keys.lookup(entity));

        // untyped mappers and leftovers have no entity to fill
        let metadata = decl.and_then(|m| {
            MetadataExtractor::new(&project.model, &project.config, &project.fills)
                .extract(m)
                .ok()
        });
        let (insert_fills, update_fills) = match &metadata {
            Some(meta) => (
                project.fills.supply_row(meta, StatementKind::Insert),
                project.fills.supply_row(meta, StatementKind::Update),
            ),
            None => Default::default(),
        };

        match self.format {
            OutputFormat::Json => {
                let report = InspectReport {
                    namespace: &doc.namespace,
                    resource: &doc.resource,
                    origin: doc.origin,
                    primary_key,
                    statements,
                    insert_fills,
                    update_fills,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text if self.statements => {
                println!("{} ({})", doc.namespace.bold(), doc.origin.as_str());
                if let Some(key) = primary_key {
                    println!("  key: {} -> {}", key.key_member, key.key_column);
                }
                for statement in statements {
                    let command = format!("{:?}", statement.command).to_lowercase();
                    println!("  {:<7} {}", command.cyan(), statement.id);
                }
                for (phase, fills) in [("insert", &insert_fills), ("update", &update_fills)] {
                    for (column, value) in fills {
                        println!("  {} {column} <- {value} on {phase}", "fill".dimmed());
                    }
                }
            }
            OutputFormat::Text => println!("{}", doc.content),
        }
        Ok(())
    }
}

/// The known namespace closest to `wanted`, if any is reasonably close.
fn closest_namespace<'a>(wanted: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .map(|ns| (strsim::levenshtein(wanted, ns), ns))
        .filter(|(distance, _)| *distance <= wanted.len().max(3) / 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, ns)| ns.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_namespace() {
        let known = vec!["demo.OrderMapper".to_string(), "demo.UserMapper".to_string()];
        assert_eq!(closest_namespace("demo.OrdrMapper", &known), Some("demo.OrderMapper"));
        assert_eq!(closest_namespace("totally.Different", &known), None);
    }
}
