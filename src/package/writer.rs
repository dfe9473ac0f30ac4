//! Document model → WordprocessingML parts.

use crate::model::{
    Alignment, Block, InlineContent, Paragraph, ParagraphStyle, Resource, ResourceKind, Table,
    TableCell, TableRow, TextRun, TextStyle,
};

use super::reader::PartLayout;
use super::xml::{escape, W_NS, R_NS};

/// Serialize `word/document.xml`.
///
/// `head` is the preserved prologue up to and including the root start tag;
/// `None` writes a minimal one.
pub(crate) fn write_main_part(head: Option<&str>, blocks: &[Block], section: Option<&str>) -> String {
    let mut out = String::with_capacity(4096);
    match head {
        Some(head) => out.push_str(head),
        None => {
            out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
            out.push_str(&format!(
                r#"<w:document xmlns:w="{}" xmlns:r="{}">"#,
                W_NS, R_NS
            ));
        }
    }

    out.push_str("<w:body>");
    write_blocks(&mut out, blocks);
    if let Some(section) = section {
        out.push_str(section);
    }
    out.push_str("</w:body></w:document>");
    out
}

/// Serialize a resource part around its (possibly merged) resources.
pub(crate) fn write_resource_part<'a>(
    layout: &PartLayout,
    resources: impl Iterator<Item = &'a Resource>,
) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(&layout.head);
    out.push_str(&layout.before);
    for resource in resources {
        out.push_str(&resource.xml);
    }
    out.push_str(&layout.after);
    out.push_str(&layout.close);
    out
}

/// Numbering resources in schema order: abstract definitions first.
pub(crate) fn numbering_order<'a>(
    resources: &'a crate::model::ResourceTable,
) -> impl Iterator<Item = &'a Resource> {
    resources
        .of_kind(ResourceKind::AbstractNumbering)
        .chain(resources.of_kind(ResourceKind::Numbering))
}

pub(crate) fn write_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        write_block(out, block);
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph(p) => write_paragraph(out, p),
        Block::Table(t) => write_table(out, t),
        Block::PageBreak => out.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
        Block::Raw { xml } => out.push_str(xml),
    }
}

fn write_paragraph(out: &mut String, paragraph: &Paragraph) {
    out.push_str("<w:p>");
    write_paragraph_properties(out, &paragraph.style);
    for item in &paragraph.content {
        match item {
            InlineContent::Text(run) => write_run(out, run),
            InlineContent::Raw(xml) => out.push_str(xml),
        }
    }
    out.push_str("</w:p>");
}

fn write_paragraph_properties(out: &mut String, style: &ParagraphStyle) {
    if let Some(ref xml) = style.properties_xml {
        out.push_str(xml);
        return;
    }

    let mut props = String::new();
    if let Some(ref id) = style.style_id {
        props.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, escape(id)));
    }
    if let Some(ref numbering) = style.numbering {
        props.push_str(&format!(
            r#"<w:numPr><w:ilvl w:val="{}"/><w:numId w:val="{}"/></w:numPr>"#,
            numbering.level,
            escape(&numbering.num_id)
        ));
    }
    if style.alignment != Alignment::Left {
        props.push_str(&format!(r#"<w:jc w:val="{}"/>"#, style.alignment.as_jc()));
    }

    if !props.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&props);
        out.push_str("</w:pPr>");
    }
}

fn write_run(out: &mut String, run: &TextRun) {
    out.push_str("<w:r>");
    write_run_properties(out, &run.style);

    let text = run.text.replace("\r\n", "\n").replace('\r', "\n");
    let mut chunk = String::new();
    for c in text.chars() {
        match c {
            '\t' | '\n' => {
                flush_text(out, &mut chunk);
                out.push_str(if c == '\t' { "<w:tab/>" } else { "<w:br/>" });
            }
            _ => chunk.push(c),
        }
    }
    flush_text(out, &mut chunk);

    out.push_str("</w:r>");
}

fn flush_text(out: &mut String, chunk: &mut String) {
    if chunk.is_empty() {
        return;
    }
    out.push_str(r#"<w:t xml:space="preserve">"#);
    out.push_str(&escape(chunk));
    out.push_str("</w:t>");
    chunk.clear();
}

fn write_run_properties(out: &mut String, style: &TextStyle) {
    if let Some(ref xml) = style.properties_xml {
        out.push_str(xml);
        return;
    }
    if !style.has_styling() {
        return;
    }

    out.push_str("<w:rPr>");
    if let Some(ref id) = style.style_ref {
        out.push_str(&format!(r#"<w:rStyle w:val="{}"/>"#, escape(id)));
    }
    if style.bold {
        out.push_str("<w:b/>");
    }
    if style.italic {
        out.push_str("<w:i/>");
    }
    if style.underline {
        out.push_str(r#"<w:u w:val="single"/>"#);
    }
    out.push_str("</w:rPr>");
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<w:tbl>");
    match table.properties_xml {
        Some(ref xml) => out.push_str(xml),
        None => {
            out.push_str("<w:tblPr>");
            if let Some(ref id) = table.style_id {
                out.push_str(&format!(r#"<w:tblStyle w:val="{}"/>"#, escape(id)));
            }
            out.push_str(r#"<w:tblW w:w="0" w:type="auto"/></w:tblPr>"#);
            out.push_str("<w:tblGrid>");
            for _ in 0..table.column_count() {
                out.push_str("<w:gridCol/>");
            }
            out.push_str("</w:tblGrid>");
        }
    }
    for row in &table.rows {
        write_row(out, row);
    }
    out.push_str("</w:tbl>");
}

fn write_row(out: &mut String, row: &TableRow) {
    out.push_str("<w:tr>");
    if let Some(ref xml) = row.properties_xml {
        out.push_str(xml);
    }
    for cell in &row.cells {
        write_cell(out, cell);
    }
    out.push_str("</w:tr>");
}

fn write_cell(out: &mut String, cell: &TableCell) {
    out.push_str("<w:tc>");
    if let Some(ref xml) = cell.properties_xml {
        out.push_str(xml);
    }
    write_blocks(out, &cell.content);
    // A cell must end with a paragraph.
    if !matches!(cell.content.last(), Some(Block::Paragraph(_))) {
        out.push_str("<w:p/>");
    }
    out.push_str("</w:tc>");
}
