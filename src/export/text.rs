//! Plain text export.

use crate::model::{Block, Document, Table};

/// Form feed written in place of page breaks.
pub const PAGE_BREAK: char = '\u{000C}';

/// Convert a document to plain text.
///
/// Paragraphs are separated by newlines, table cells by tabs, and page
/// breaks become a form feed on a line of its own. Preserved elements
/// without text (bookmarks, drawings, section markers) are skipped.
pub fn to_text(doc: &Document) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(doc.blocks.len());
    for block in &doc.blocks {
        match block {
            Block::Paragraph(p) => lines.push(p.plain_text()),
            Block::Table(t) => push_table(&mut lines, t),
            Block::PageBreak => lines.push(PAGE_BREAK.to_string()),
            Block::Raw { .. } => {}
        }
    }
    lines.join("\n").trim_end().to_string()
}

fn push_table(lines: &mut Vec<String>, table: &Table) {
    for row in &table.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| cell.plain_text().replace('\n', " "))
            .collect();
        lines.push(cells.join("\t"));
    }
}
