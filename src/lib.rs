//! # docmerge
//!
//! Mail merge for word-processing documents.
//!
//! This library fills a formatted `.docx` template with field values from a
//! list of records and produces either one document per record or a single
//! composed document with a page break between records. Fonts, styles,
//! tables, numbering and every package part the engine does not edit are
//! carried over unchanged.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docmerge::{MailMerge, Record, Template};
//!
//! fn main() -> docmerge::Result<()> {
//!     let template = Template::open("invitation.docx")?;
//!     let records = vec![
//!         Record::new().with("Name", "Anna").with("Code", "A1"),
//!         Record::new().with("Name", "Juris").with("Code", "B2"),
//!     ];
//!
//!     let result = MailMerge::new().run(&template, &records);
//!     for failure in &result.failed {
//!         eprintln!("record {}: {}", failure.index, failure.message);
//!     }
//!     result.save_all(&template, "letters")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two placeholder forms**: `{{Name}}` and `{[Name]}`
//! - **Formatting preservation**: placeholders split across runs by Word
//!   are still found, and run styling is never changed
//! - **Tables**: placeholders inside (nested) table cells are substituted
//! - **Failure isolation**: a bad record is reported and skipped, the rest
//!   of the batch continues
//! - **Composition**: style and numbering definitions are merged by
//!   identifier when records are joined into one document
//! - **Parallel rendering**: optional, using Rayon, output order preserved

pub mod detect;
pub mod error;
pub mod export;
pub mod merge;
pub mod model;
pub mod package;
pub mod record;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, DocumentFormat};
pub use error::{Error, ErrorKind, RenderError, Result};
pub use export::{DocumentStats, JsonFormat};
pub use merge::{
    compose, render, resolve, BatchPhase, BatchResult, MailMerge, MergeOptions,
    MissingValuePolicy, OutputDocument, OutputMode, RecordFailure, RenderedDocument, SaveReport,
    Substitutions, Template,
};
pub use model::{
    Alignment, Block, Document, InlineContent, Metadata, NumberingRef, Paragraph, ParagraphStyle,
    Resource, ResourceKind, ResourceTable, Table, TableCell, TableRow, TextRun, TextStyle,
};
pub use package::{DocxPackage, ErrorMode, ParseOptions};
pub use record::{FieldValue, Record};

use std::path::Path;

/// Load a template file.
///
/// # Example
///
/// ```no_run
/// use docmerge::open_template;
///
/// let template = open_template("letter.docx").unwrap();
/// println!("Fields: {:?}", template.placeholders());
/// ```
pub fn open_template<P: AsRef<Path>>(path: P) -> Result<Template> {
    Template::open(path)
}

/// List the placeholder names used in a template file.
///
/// # Example
///
/// ```no_run
/// use docmerge::extract_placeholders;
///
/// for name in extract_placeholders("letter.docx").unwrap() {
///     println!("{}", name);
/// }
/// ```
pub fn extract_placeholders<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    Ok(Template::open(path)?.placeholders().to_vec())
}

/// Merge records into a template file with default options.
///
/// Template load failures end the batch in [`BatchPhase::LoadFailed`].
///
/// # Example
///
/// ```no_run
/// use docmerge::{merge_file, OutputMode, Record};
///
/// let records = vec![Record::new().with("Name", "Anna")];
/// let result = merge_file("letter.docx", &records, OutputMode::Composed);
/// assert!(result.is_complete());
/// ```
pub fn merge_file<P: AsRef<Path>>(path: P, records: &[Record], mode: OutputMode) -> BatchResult {
    MailMerge::new().with_mode(mode).run_file(path, records)
}

/// Render one record and return the result as plain text.
///
/// # Example
///
/// ```
/// use docmerge::{preview, Document, Paragraph, Record, Template};
///
/// let mut doc = Document::new();
/// doc.add_paragraph(Paragraph::with_text("Hello {{Name}}!"));
/// let template = Template::from_document(doc);
///
/// let text = preview(&template, &Record::new().with("Name", "Anna")).unwrap();
/// assert_eq!(text, "Hello Anna!");
/// ```
pub fn preview(template: &Template, record: &Record) -> Result<String> {
    let rendered = render(template, record)?;
    Ok(export::to_text(&rendered.document))
}

/// Extract plain text from a `.docx` file.
pub fn to_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let (_, doc) = DocxPackage::read_file(path, &ParseOptions::default())?;
    Ok(export::to_text(&doc))
}

/// Convert a `.docx` file's content model to JSON.
///
/// # Example
///
/// ```no_run
/// use docmerge::{to_json, JsonFormat};
///
/// let json = to_json("letter.docx", JsonFormat::Pretty).unwrap();
/// std::fs::write("letter.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let (_, doc) = DocxPackage::read_file(path, &ParseOptions::default())?;
    export::to_json(&doc, format)
}
