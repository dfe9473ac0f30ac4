//! Document model types for template and merged content.
//!
//! This module defines the intermediate representation shared by the
//! package reader, the merge engine and the package writer. The model keeps
//! every formatting detail it does not interpret as verbatim XML, so a
//! document read and written back is unchanged apart from edited text.

mod block;
mod document;
mod paragraph;
mod resource;
mod table;

pub use block::{for_each_paragraph, Block};
pub use document::{Document, Metadata};
pub use paragraph::{
    Alignment, InlineContent, NumberingRef, Paragraph, ParagraphStyle, TextRun, TextStyle,
};
pub use resource::{Resource, ResourceKind, ResourceTable};
pub use table::{Table, TableCell, TableRow};
