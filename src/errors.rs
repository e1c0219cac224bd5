use thiserror::Error;

/// Main error type for the tailwind-inliner crate
#[derive(Debug, Error)]
pub enum InlinerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No files found matching the provided patterns")]
    NoFilesFound,

    #[error("Failed to parse template {path}: {message}")]
    TemplateError { path: String, message: String },

    #[error("Failed to write output to {path}: {message}")]
    OutputError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Class compiler error: {0}")]
    CompilerError(String),

    #[error("Source map error: {0}")]
    SourceMapError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input error: {0}")]
    InputError(String),
}

pub type Result<T> = std::result::Result<T, InlinerError>;
