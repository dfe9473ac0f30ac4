//! Document package format detection.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Zip local file header signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Main document content types.
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const DOTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";
const DOCM_CONTENT_TYPE: &str = "application/vnd.ms-word.document.macroEnabled.main+xml";

/// Kind of word-processing package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// Regular document (.docx)
    #[default]
    Docx,
    /// Template (.dotx)
    Dotx,
    /// Macro-enabled document (.docm)
    Docm,
}

impl DocumentFormat {
    /// Determine the format from `[Content_Types].xml` content.
    pub fn from_content_types(xml: &str) -> Self {
        if xml.contains(DOTX_CONTENT_TYPE) {
            DocumentFormat::Dotx
        } else if xml.contains(DOCM_CONTENT_TYPE) {
            DocumentFormat::Docm
        } else {
            DocumentFormat::Docx
        }
    }

    /// Content type of the main document part.
    pub fn main_content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => DOCX_CONTENT_TYPE,
            DocumentFormat::Dotx => DOTX_CONTENT_TYPE,
            DocumentFormat::Docm => DOCM_CONTENT_TYPE,
        }
    }

    /// Format of documents merged from a package of this format.
    ///
    /// Merging a template (.dotx) yields a regular document.
    pub fn output_format(&self) -> Self {
        match self {
            DocumentFormat::Dotx => DocumentFormat::Docx,
            other => *other,
        }
    }

    /// Usual file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Dotx => "dotx",
            DocumentFormat::Docm => "docm",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}

/// Check that a file starts like a zip package.
///
/// # Example
/// ```no_run
/// use docmerge::detect::detect_format_from_path;
///
/// detect_format_from_path("letter.docx").unwrap();
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .map_err(|_| Error::UnknownFormat)?;
    detect_format_from_bytes(&header)
}

/// Check that data starts with the zip local file header.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<()> {
    if is_zip_bytes(data) {
        Ok(())
    } else {
        Err(Error::UnknownFormat)
    }
}

/// Check if bytes look like a zip package.
pub fn is_zip_bytes(data: &[u8]) -> bool {
    data.len() >= ZIP_MAGIC.len() && data.starts_with(ZIP_MAGIC)
}
