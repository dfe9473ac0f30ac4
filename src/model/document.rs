//! Document-level types.

use super::{for_each_paragraph, Block, Paragraph, ResourceKind, ResourceTable, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A document: ordered blocks plus the shared definitions they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Content blocks in reading order
    pub blocks: Vec<Block>,

    /// Styles and numbering definitions
    pub resources: ResourceTable,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block to the document.
    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Add a paragraph to the document.
    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    /// Add a table to the document.
    pub fn add_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Check if the document has any blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get the number of top-level blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of page break markers at the top level.
    pub fn page_break_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_page_break()).count()
    }

    /// Split the blocks at page break markers.
    pub fn sections(&self) -> Vec<&[Block]> {
        self.blocks.split(|b| b.is_page_break()).collect()
    }

    /// All paragraphs, including those nested in table cells.
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        for_each_paragraph(&self.blocks, &mut |p| out.push(p));
        out
    }

    /// Style and numbering identifiers referenced by the content.
    pub fn referenced_resources(&self) -> BTreeSet<(ResourceKind, String)> {
        let mut refs = BTreeSet::new();
        collect_table_styles(&self.blocks, &mut refs);
        for paragraph in self.paragraphs() {
            if let Some(ref id) = paragraph.style.style_id {
                refs.insert((ResourceKind::Style, id.clone()));
            }
            if let Some(ref numbering) = paragraph.style.numbering {
                refs.insert((ResourceKind::Numbering, numbering.num_id.clone()));
            }
            for run in paragraph.runs() {
                if let Some(ref id) = run.style.style_ref {
                    refs.insert((ResourceKind::Style, id.clone()));
                }
            }
        }
        refs
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| block.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn collect_table_styles(blocks: &[Block], refs: &mut BTreeSet<(ResourceKind, String)>) {
    for block in blocks {
        if let Block::Table(table) = block {
            if let Some(ref id) = table.style_id {
                refs.insert((ResourceKind::Style, id.clone()));
            }
            for cell in table.rows.iter().flat_map(|r| &r.cells) {
                collect_table_styles(&cell.content, refs);
            }
        }
    }
}

/// Document metadata from the package core properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NumberingRef, TableCell, TableRow, TextRun, TextStyle};

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.block_count(), 0);
        assert_eq!(doc.page_break_count(), 0);
    }

    #[test]
    fn test_sections() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("one"));
        doc.add_block(Block::PageBreak);
        doc.add_paragraph(Paragraph::with_text("two"));
        doc.add_paragraph(Paragraph::with_text("three"));

        let sections = doc.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].len(), 2);
        assert_eq!(doc.plain_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_referenced_resources() {
        let mut para = Paragraph::with_runs([TextRun {
            text: "x".into(),
            style: TextStyle {
                style_ref: Some("Strong".into()),
                ..Default::default()
            },
        }])
        .styled("Heading1");
        para.style.numbering = Some(NumberingRef {
            num_id: "3".into(),
            level: 0,
        });

        let mut table = Table::new();
        table.style_id = Some("TableGrid".into());
        table.add_row(TableRow::new(vec![TableCell::with_content(vec![
            Block::Paragraph(para),
        ])]));

        let mut doc = Document::new();
        doc.add_table(table);

        let refs = doc.referenced_resources();
        assert!(refs.contains(&(ResourceKind::Style, "Heading1".to_string())));
        assert!(refs.contains(&(ResourceKind::Style, "Strong".to_string())));
        assert!(refs.contains(&(ResourceKind::Style, "TableGrid".to_string())));
        assert!(refs.contains(&(ResourceKind::Numbering, "3".to_string())));
        assert_eq!(refs.len(), 4);
    }
}
