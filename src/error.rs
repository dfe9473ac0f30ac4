//! Error types for docmerge library.

use std::io;
use thiserror::Error;

/// Result type alias for docmerge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, merging or writing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as a document package.
    #[error("Unknown file format: not a valid DOCX package")]
    UnknownFormat,

    /// Error reading or writing the zip container.
    #[error("Package error: {0}")]
    Zip(String),

    /// Malformed XML inside a package part.
    #[error("XML error: {0}")]
    Xml(String),

    /// The template could not be loaded. Fatal for the whole batch.
    #[error("Template load error: {0}")]
    TemplateLoad(String),

    /// A single record could not be rendered.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Rendered documents could not be composed into one output.
    #[error("Compose error: {0}")]
    Compose(String),

    /// Error during export (text, JSON).
    #[error("Export error: {0}")]
    Export(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap any lower-level failure as a template load failure.
    pub fn template_load(err: impl std::fmt::Display) -> Self {
        Error::TemplateLoad(err.to_string())
    }

    /// Classify the error for failure reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TemplateLoad(_) | Error::UnknownFormat => ErrorKind::TemplateLoad,
            Error::Render(_) => ErrorKind::Render,
            Error::Compose(_) => ErrorKind::Compose,
            Error::Io(_) => ErrorKind::Io,
            Error::Zip(_) | Error::Xml(_) => ErrorKind::Package,
            Error::Export(_) | Error::Other(_) => ErrorKind::Other,
        }
    }
}

/// Per-record rendering failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A field value cannot be written into the document.
    #[error("field '{field}' has an invalid value: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A required field is missing or empty.
    #[error("required field '{0}' is missing")]
    MissingField(String),
}

/// Coarse error classification used in batch failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Template unreadable or structurally invalid
    TemplateLoad,
    /// Record could not be rendered
    Render,
    /// Resource conflict during composition
    Compose,
    /// Filesystem failure
    Io,
    /// Zip or XML failure in a package part
    Package,
    /// Anything else
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::TemplateLoad => "TemplateLoadError",
            ErrorKind::Render => "RenderError",
            ErrorKind::Compose => "ComposeError",
            ErrorKind::Io => "IOError",
            ErrorKind::Package => "PackageError",
            ErrorKind::Other => "Error",
        };
        f.write_str(name)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Zip(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}
