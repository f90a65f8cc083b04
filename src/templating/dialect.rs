//! SQL dialects and template resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::TemplateConfig;
use crate::constants::{GLOBAL_TEMPLATE_PLACEHOLDER, TEMPLATE_SUFFIX};
use crate::core::{MapperError, Result};

/// Database product a document is generated for.
///
/// Each variant selects its own document template; adding a database means adding
/// a variant and a built-in template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    Oracle,
    SqlServer,
    PostgreSql,
}

impl Dialect {
    pub const ALL: [Self; 4] = [Self::MySql, Self::Oracle, Self::SqlServer, Self::PostgreSql];

    /// Identifier used in configuration and template file names.
    pub const fn id(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Oracle => "oracle",
            Self::SqlServer => "sqlserver",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Template shipped with the crate.
    pub const fn builtin_template(self) -> &'static str {
        match self {
            Self::MySql => include_str!("../../templates/mysql.tera"),
            Self::Oracle => include_str!("../../templates/oracle.tera"),
            Self::SqlServer => include_str!("../../templates/sqlserver.tera"),
            Self::PostgreSql => include_str!("../../templates/postgresql.tera"),
        }
    }

    fn file_name(self) -> String {
        format!("{}{TEMPLATE_SUFFIX}", self.id())
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dialect {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MapperError::ConfigError {
                message: format!(
                    "unknown dialect '{s}' (expected one of: {})",
                    Self::ALL.map(Self::id).join(", ")
                ),
            })
    }
}

/// Template text ready for rendering, with its origin for logging.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub text: String,
    pub origin: String,
}

/// Resolve the dialect template and splice in the global template.
///
/// Lookup order: `<override_dir>/<dialect>.tera` (the project root when unset),
/// then `<dir>/<dialect>.tera`, then the built-in template.
pub fn resolve_template(dialect: Dialect, config: &TemplateConfig, project_root: &Path) -> Result<ResolvedTemplate> {
    let resolve = |dir: &Path| -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            project_root.join(dir)
        }
    };

    let mut candidates = vec![resolve(config.override_dir.as_deref().unwrap_or(Path::new(".")))];
    if let Some(dir) = &config.dir {
        candidates.push(resolve(dir));
    }

    let mut resolved = None;
    for dir in candidates {
        let path = dir.join(dialect.file_name());
        if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| MapperError::io("read template", &path, e))?;
            resolved = Some(ResolvedTemplate {
                text,
                origin: path.display().to_string(),
            });
            break;
        }
    }
    let mut template = resolved.unwrap_or_else(|| ResolvedTemplate {
        text: dialect.builtin_template().to_string(),
        origin: format!("built-in {dialect}"),
    });

    if let Some(global) = &config.global {
        let path = resolve(global);
        if !path.is_file() {
            return Err(MapperError::TemplateNotFound {
                dialect: "global".to_string(),
                searched: path.display().to_string(),
            });
        }
        let global_text = std::fs::read_to_string(&path)
            .map_err(|e| MapperError::io("read global template", &path, e))?;
        template.text = splice_global(&template.text, &global_text);
    }

    tracing::debug!("Using {} template from {}", dialect, template.origin);
    Ok(template)
}

/// Replace the global placeholder with the global template text.
pub fn splice_global(template: &str, global: &str) -> String {
    template.replace(GLOBAL_TEMPLATE_PLACEHOLDER, global)
}
