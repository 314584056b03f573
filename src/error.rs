//! Error types surfaced by the synthesis engine.
//!
//! `EngineError` is the single error type returned by every fallible
//! public entry point. Each variant carries enough structured context
//! (offending file, variable, path) for a caller to render a precise
//! message without parsing the `Display` string, and maps 1:1 onto the
//! flat error taxonomy callers may want to branch on via [`ErrorKind`].

use std::path::PathBuf;
use thiserror::Error;

/// Flat, stable error-category tag, independent of the variant's
/// payload shape. Callers that only need to branch on category (e.g.
/// to decide whether to report to an end user or log as a blueprint
/// bug) should match on this instead of the `EngineError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ManifestNotFound,
    ManifestInvalid,
    DuplicateId,
    UnknownBlueprint,
    MissingRequired,
    InvalidType,
    InvalidChoice,
    ValidationFailed,
    PredicateMalformed,
    TemplateInvalid,
    RenderTimeout,
    GeneratedInvalidGo,
    DuplicateDestination,
    PathTraversal,
    OutputExists,
    GenerationAborted,
    FilesystemError,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("manifest not found in blueprint directory {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("manifest at {path} is invalid: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("duplicate blueprint id: {id}")]
    DuplicateId { id: String },

    #[error("unknown blueprint: {type_}{}", architecture.as_ref().map(|a| format!("/{a}")).unwrap_or_default())]
    UnknownBlueprint {
        type_: String,
        architecture: Option<String>,
    },

    #[error("missing required variable: {name}")]
    MissingRequired { name: String },

    #[error("variable {name} cannot be cast to type {expected}: {value}")]
    InvalidType {
        name: String,
        expected: String,
        value: String,
    },

    #[error("variable {name} value {value} is not one of the declared choices: {choices:?}")]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("predicate is malformed: {expression}: {reason}")]
    PredicateMalformed { expression: String, reason: String },

    #[error("template {path} is invalid: {reason}")]
    TemplateInvalid { path: String, reason: String },

    #[error("render of {path} exceeded its deadline")]
    RenderTimeout { path: String },

    #[error("generated file {path} is not valid Go: {reason}")]
    GeneratedInvalidGo { path: String, reason: String },

    #[error("two blueprint files resolved to the same destination: {path}")]
    DuplicateDestination { path: String },

    #[error("path {path} escapes the output root")]
    PathTraversal { path: String },

    #[error("output path {path} already exists and is non-empty")]
    OutputExists { path: PathBuf },

    #[error("generation aborted: {reason}")]
    GenerationAborted { reason: String },

    #[error("filesystem error: {0}")]
    FilesystemError(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template engine error: {0}")]
    Handlebars(Box<handlebars::RenderError>),

    #[error("template syntax error: {0}")]
    HandlebarsTemplate(Box<handlebars::TemplateError>),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}

impl From<handlebars::RenderError> for EngineError {
    fn from(err: handlebars::RenderError) -> Self {
        EngineError::Handlebars(Box::new(err))
    }
}

impl From<handlebars::TemplateError> for EngineError {
    fn from(err: handlebars::TemplateError) -> Self {
        EngineError::HandlebarsTemplate(Box::new(err))
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ManifestNotFound { .. } => ErrorKind::ManifestNotFound,
            EngineError::ManifestInvalid { .. } => ErrorKind::ManifestInvalid,
            EngineError::DuplicateId { .. } => ErrorKind::DuplicateId,
            EngineError::UnknownBlueprint { .. } => ErrorKind::UnknownBlueprint,
            EngineError::MissingRequired { .. } => ErrorKind::MissingRequired,
            EngineError::InvalidType { .. } => ErrorKind::InvalidType,
            EngineError::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            EngineError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            EngineError::PredicateMalformed { .. } => ErrorKind::PredicateMalformed,
            EngineError::TemplateInvalid { .. } => ErrorKind::TemplateInvalid,
            EngineError::RenderTimeout { .. } => ErrorKind::RenderTimeout,
            EngineError::GeneratedInvalidGo { .. } => ErrorKind::GeneratedInvalidGo,
            EngineError::DuplicateDestination { .. } => ErrorKind::DuplicateDestination,
            EngineError::PathTraversal { .. } => ErrorKind::PathTraversal,
            EngineError::OutputExists { .. } => ErrorKind::OutputExists,
            EngineError::GenerationAborted { .. } => ErrorKind::GenerationAborted,
            EngineError::FilesystemError(_) => ErrorKind::FilesystemError,
            EngineError::Yaml(_) => ErrorKind::ManifestInvalid,
            EngineError::Json(_) => ErrorKind::ManifestInvalid,
            EngineError::Handlebars(_) => ErrorKind::TemplateInvalid,
            EngineError::HandlebarsTemplate(_) => ErrorKind::TemplateInvalid,
            EngineError::Regex(_) => ErrorKind::ManifestInvalid,
        }
    }

    /// Wraps a pre-emission or emission-time error as the terminal
    /// `GENERATION_ABORTED` kind, preserving the original message.
    pub fn aborted(reason: impl Into<String>) -> Self {
        EngineError::GenerationAborted {
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
