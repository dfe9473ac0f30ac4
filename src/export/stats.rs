//! Content statistics for templates and merged documents.

use serde::{Deserialize, Serialize};

use crate::model::{for_each_paragraph, Block, Document, ResourceKind};

/// Counts of the structural elements in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Paragraphs, including those inside table cells
    pub paragraph_count: u32,

    /// Text runs
    pub run_count: u32,

    /// Tables, including nested tables
    pub table_count: u32,

    /// Page breaks between composed sections
    pub page_break_count: u32,

    /// Body elements kept verbatim
    pub preserved_count: u32,

    /// Style definitions
    pub style_count: u32,

    /// Numbering definitions (abstract and instances)
    pub numbering_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl DocumentStats {
    /// Collect statistics for a document.
    pub fn from_document(doc: &Document) -> Self {
        let mut stats = Self::default();
        stats.count_blocks(&doc.blocks);

        for_each_paragraph(&doc.blocks, &mut |p| {
            stats.paragraph_count += 1;
            stats.run_count += p.run_count() as u32;
            stats.count_text(&p.plain_text());
        });

        for resource in doc.resources.iter() {
            match resource.kind {
                ResourceKind::Style => stats.style_count += 1,
                ResourceKind::AbstractNumbering | ResourceKind::Numbering => {
                    stats.numbering_count += 1
                }
            }
        }
        stats
    }

    fn count_blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Table(t) => {
                    self.table_count += 1;
                    for cell in t.rows.iter().flat_map(|r| &r.cells) {
                        self.count_blocks(&cell.content);
                    }
                }
                Block::PageBreak => self.page_break_count += 1,
                Block::Raw { .. } => self.preserved_count += 1,
                Block::Paragraph(_) => {}
            }
        }
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }
}
