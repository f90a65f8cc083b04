//! Error handling for seedmap
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`MapperError`]) flow through the synthesis pipeline
//! 2. **User-friendly messages** ([`ErrorContext`]) are produced at the CLI boundary
//!
//! # Error Categories
//!
//! - **Recoverable**: [`MapperError::NotAnEntityInterface`] degrades to an empty
//!   placeholder document instead of failing the build.
//! - **Metadata validation**: [`MapperError::UnsupportedEnumType`],
//!   [`MapperError::InvalidMetadata`], [`MapperError::ConflictingKeyStrategy`],
//!   [`MapperError::UnknownEntity`], [`MapperError::UnknownAssociation`].
//! - **Fragment merging**: [`MapperError::MissingNamespace`],
//!   [`MapperError::InvalidFragment`].
//! - **Templates**: [`MapperError::TemplateNotFound`], [`MapperError::TemplateRender`].
//! - **Registry**: [`MapperError::DuplicateEntry`].
//! - **Aggregate**: [`MapperError::DocumentBuild`] wraps whatever aborted a build and
//!   always carries the root cause.
//!
//! # Examples
//!
//! ```rust,no_run
//! use seedmap::core::{MapperError, user_friendly_error};
//!
//! let err = MapperError::MissingNamespace {
//!     filename: "OrderExtMapper.xml".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = MapperError> = std::result::Result<T, E>;

/// The main error type for seedmap operations.
#[derive(Error, Debug)]
pub enum MapperError {
    /// The mapped interface resolves to no concrete entity type.
    ///
    /// Callers treat this as "nothing to generate" and emit an empty placeholder
    /// document for the namespace.
    #[error("Mapper '{namespace}' does not declare a concrete entity type")]
    NotAnEntityInterface {
        /// Namespace of the mapped interface
        namespace: String,
    },

    /// An enumeration used as a column type does not supply a scalar code value.
    #[error("Enum '{enum_name}' used by {entity}.{member} must declare a scalar code value")]
    UnsupportedEnumType {
        /// Entity declaring the member
        entity: String,
        /// Member whose type is the enumeration
        member: String,
        /// Name of the offending enumeration
        enum_name: String,
    },

    /// Entity metadata violates an invariant.
    #[error("Invalid metadata for entity '{entity}': {reason}")]
    InvalidMetadata {
        /// Entity being extracted
        entity: String,
        /// What was wrong
        reason: String,
    },

    /// A primary key declares both a sequence and an explicit UUID strategy.
    #[error("Primary key of '{entity}' declares sequence '{sequence}' together with a UUID strategy")]
    ConflictingKeyStrategy {
        /// Entity being extracted
        entity: String,
        /// Declared sequence name
        sequence: String,
    },

    /// A mapper refers to an entity that was never declared.
    #[error("Mapper '{namespace}' refers to unknown entity '{entity}'")]
    UnknownEntity {
        /// Namespace of the mapper
        namespace: String,
        /// Referenced entity name
        entity: String,
    },

    /// An association points to an entity that no mapper serves.
    #[error("Association {entity}.{property} targets '{target}', which has no mapper")]
    UnknownAssociation {
        /// Entity declaring the association
        entity: String,
        /// Association property
        property: String,
        /// Associated entity name
        target: String,
    },

    /// A fragment has no (or a blank) namespace attribute on its root element.
    #[error("Mapper fragment '{filename}' has no namespace attribute")]
    MissingNamespace {
        /// Fragment filename
        filename: String,
    },

    /// A fragment is not a well-formed mapping document.
    #[error("Invalid mapper fragment '{filename}': {reason}")]
    InvalidFragment {
        /// Fragment filename
        filename: String,
        /// What was wrong
        reason: String,
    },

    /// No template could be resolved for the dialect.
    #[error("No template found for dialect '{dialect}' (searched: {searched})")]
    TemplateNotFound {
        /// Dialect identifier
        dialect: String,
        /// Locations that were searched, comma separated
        searched: String,
    },

    /// Template evaluation failed.
    #[error("Failed to render template for '{namespace}': {message}")]
    TemplateRender {
        /// Namespace being rendered
        namespace: String,
        /// Renderer message
        message: String,
    },

    /// The registry already holds an entry under the same key.
    #[error("Registry already contains {kind} '{key}'")]
    DuplicateEntry {
        /// Table the entry belongs to (statement, result map, ...)
        kind: &'static str,
        /// Full `namespace.id` key
        key: String,
    },

    /// Aggregate failure of a document build; no partial state is published.
    #[error("Failed to build mapper documents: {source}")]
    DocumentBuild {
        /// Root cause
        #[source]
        source: Box<MapperError>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// File system operation failed
    #[error("File system error during {operation} on {path}: {source}")]
    Io {
        /// Operation being performed
        operation: &'static str,
        /// Path involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing failed
    #[error("Failed to parse {file}: {source}")]
    Toml {
        /// File being parsed
        file: String,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

impl MapperError {
    /// Wrap an error as the aggregate build failure, leaving an existing wrapper alone.
    #[must_use]
    pub fn into_build_error(self) -> Self {
        match self {
            Self::DocumentBuild { .. } => self,
            other => Self::DocumentBuild {
                source: Box::new(other),
            },
        }
    }

    /// The innermost cause of a build failure.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::DocumentBuild { source } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Error wrapper with a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// Rendered message of the underlying error
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details about the error
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Known [`MapperError`] variants get targeted suggestions; anything else is shown
/// with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<ErrorContext>() {
        Ok(context) => return context,
        Err(error) => error,
    };

    if let Some(mapper_error) = error.downcast_ref::<MapperError>() {
        return create_error_context(mapper_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::NotFound
    {
        return ErrorContext::new(format!("{error:#}"))
            .with_suggestion("Check that the file or directory exists and the path is correct");
    }

    ErrorContext::new(format!("{error:#}"))
}

fn create_error_context(error: &MapperError) -> ErrorContext {
    let outer = error.to_string();
    match error.root_cause() {
        MapperError::MissingNamespace { filename } => ErrorContext::new(outer)
            .with_suggestion(format!(
                "Add a namespace attribute to the <mapper> root element of {filename}"
            ))
            .with_details("Fragments are matched to mappers by namespace; a fragment without one cannot be placed"),
        MapperError::InvalidFragment { .. } => ErrorContext::new(outer)
            .with_suggestion("Make sure the fragment is a single <mapper namespace=\"...\"> document"),
        MapperError::UnsupportedEnumType { enum_name, .. } => ErrorContext::new(outer)
            .with_suggestion(format!("Declare a `code_type` for enum '{enum_name}' in the model file")),
        MapperError::TemplateNotFound { .. } => ErrorContext::new(outer)
            .with_suggestion("Set [templates].dir in seedmap.toml or use one of: mysql, oracle, sqlserver, postgresql"),
        MapperError::TemplateRender { .. } => ErrorContext::new(outer)
            .with_details("Template variables available: context, table, key, columns, all_columns, associations, count_expression"),
        MapperError::DuplicateEntry { .. } => ErrorContext::new(outer)
            .with_suggestion("Two documents define the same statement id under one namespace; rename or remove one of them"),
        MapperError::UnknownEntity { .. } | MapperError::UnknownAssociation { .. } => {
            ErrorContext::new(outer).with_suggestion("Declare the entity in the model file and give it a mapper")
        }
        MapperError::Toml { .. } | MapperError::ConfigError { .. } => ErrorContext::new(outer)
            .with_suggestion("Check seedmap.toml syntax and field names"),
        _ => ErrorContext::new(outer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_keeps_root_cause() {
        let err = MapperError::MissingNamespace {
            filename: "A.xml".to_string(),
        }
        .into_build_error();

        assert!(matches!(err, MapperError::DocumentBuild { .. }));
        assert!(matches!(err.root_cause(), MapperError::MissingNamespace { .. }));

        // wrapping twice does not nest
        let again = err.into_build_error();
        match again {
            MapperError::DocumentBuild { source } => {
                assert!(matches!(*source, MapperError::MissingNamespace { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_missing_namespace() {
        let err = MapperError::MissingNamespace {
            filename: "Broken.xml".to_string(),
        }
        .into_build_error();
        let ctx = user_friendly_error(anyhow::Error::from(err));
        assert!(ctx.message.contains("Broken.xml"));
        assert!(ctx.suggestion.as_deref().unwrap_or_default().contains("namespace"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new("boom").with_details("d").with_suggestion("s");
        assert_eq!(ctx.to_string(), "boom\nDetails: d\nSuggestion: s");
    }
}
