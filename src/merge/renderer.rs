//! Template loading and per-record rendering.

use std::path::Path;

use crate::error::{Error, RenderError, Result};
use crate::model::{Block, Document, InlineContent, Paragraph};
use crate::package::fragment::Fragment;
use crate::package::{DocxPackage, ParseOptions};
use crate::record::Record;

use super::options::MergeOptions;
use super::policy::substitution_text;
use super::resolver::{redistribute, scanner, Substitutions};

/// A parsed, immutable template.
///
/// Rendering never modifies the template; every rendered document owns a
/// deep copy of its content, so one template can be shared across threads.
#[derive(Debug, Clone)]
pub struct Template {
    package: DocxPackage,
    document: Document,
    placeholders: Vec<String>,
    header_placeholders: Vec<String>,
}

impl Template {
    /// Load a template from a `.docx` file.
    ///
    /// # Example
    /// ```no_run
    /// use docmerge::Template;
    ///
    /// let template = Template::open("invitation.docx")?;
    /// println!("fields: {:?}", template.placeholders());
    /// # Ok::<(), docmerge::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ParseOptions::default())
    }

    /// Load a template from a file with custom parse options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| Error::TemplateLoad(format!("{}: {}", path.display(), e)))?;
        let template = Self::from_bytes_with(&data, options)?;
        log::info!(
            "Loaded template {} ({} placeholders)",
            path.display(),
            template.placeholders.len()
        );
        Ok(template)
    }

    /// Load a template from `.docx` bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with(data, &ParseOptions::default())
    }

    /// Load a template from bytes with custom parse options.
    pub fn from_bytes_with(data: &[u8], options: &ParseOptions) -> Result<Self> {
        let (package, document) = DocxPackage::parse(data, options).map_err(|e| match e {
            Error::TemplateLoad(_) => e,
            other => Error::template_load(other),
        })?;
        Ok(Self::assemble(package, document))
    }

    /// Use a document built in code as the template.
    ///
    /// Outputs are written into a minimal blank package.
    pub fn from_document(document: Document) -> Self {
        Self::assemble(DocxPackage::blank(), document)
    }

    fn assemble(package: DocxPackage, document: Document) -> Self {
        let placeholders = collect_placeholders(&document);
        log::debug!(
            "Template has {} blocks, {} resources, placeholders {:?}",
            document.block_count(),
            document.resources.len(),
            placeholders
        );

        let mut header_placeholders = Vec::new();
        for (name, xml) in package.header_footer_parts() {
            let Some(fragment) = open_fragment(xml) else {
                continue;
            };
            let (inline, paragraphs) = fragment.texts();
            let mut found = false;
            for text in std::iter::once(&inline).chain(&paragraphs) {
                for placeholder in scanner().scan(text) {
                    found = true;
                    if !header_placeholders.contains(&placeholder.name) {
                        header_placeholders.push(placeholder.name);
                    }
                }
            }
            if found {
                log::warn!("{} has placeholders that are not merged", name);
            }
        }

        Self {
            package,
            document,
            placeholders,
            header_placeholders,
        }
    }

    /// The template content.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The package the template was read from.
    pub fn package(&self) -> &DocxPackage {
        &self.package
    }

    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Placeholder names found in headers and footers.
    ///
    /// Header and footer parts are copied into every output as they are, so
    /// these are never substituted.
    pub fn header_placeholders(&self) -> &[String] {
        &self.header_placeholders
    }

    /// Serialize a merged document into the template's package.
    pub fn write_document(&self, document: &Document) -> Result<Vec<u8>> {
        self.package.write(document)
    }

    /// Write a merged document to a `.docx` file.
    pub fn save_document<P: AsRef<Path>>(&self, document: &Document, path: P) -> Result<()> {
        self.package.save(document, path)
    }
}

/// A template rendered with one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    /// Position of the record in the input
    pub record_index: usize,
    /// Deep copy of the template with placeholders substituted
    pub document: Document,
    /// Placeholder names still present after substitution
    pub unresolved: Vec<String>,
}

/// Render a template with one record using default options.
pub fn render(template: &Template, record: &Record) -> Result<RenderedDocument> {
    render_with(template, record, &MergeOptions::default())
}

/// Render a template with one record.
pub fn render_with(
    template: &Template,
    record: &Record,
    options: &MergeOptions,
) -> Result<RenderedDocument> {
    render_record(template, 0, record, options)
}

pub(crate) fn render_record(
    template: &Template,
    index: usize,
    record: &Record,
    options: &MergeOptions,
) -> Result<RenderedDocument> {
    let values = prepare_substitutions(template, record, options)?;

    let mut document = template.document.clone();
    apply_blocks(&mut document.blocks, &values);

    let unresolved = collect_placeholders(&document);
    if !unresolved.is_empty() {
        log::debug!("Record {}: unresolved placeholders {:?}", index, unresolved);
    }

    Ok(RenderedDocument {
        record_index: index,
        document,
        unresolved,
    })
}

/// Compute the replacement text for every placeholder the template uses.
///
/// Fails if a required field is missing or a referenced value cannot be
/// written into the document.
pub fn prepare_substitutions(
    template: &Template,
    record: &Record,
    options: &MergeOptions,
) -> std::result::Result<Substitutions, RenderError> {
    for name in &options.required_fields {
        let present = match record.get(name) {
            Some(value) if !value.is_absent() => {
                value.as_text().map_or(true, |text| !text.trim().is_empty())
            }
            _ => false,
        };
        if !present {
            return Err(RenderError::MissingField(name.clone()));
        }
    }

    let mut values = Substitutions::new();
    for name in &template.placeholders {
        if let Some(text) = substitution_text(name, record.get(name), options)? {
            values.insert(name.clone(), text);
        }
    }
    Ok(values)
}

fn apply_blocks(blocks: &mut [Block], values: &Substitutions) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => apply(p, values),
            Block::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| &mut r.cells) {
                    apply_blocks(&mut cell.content, values);
                }
            }
            Block::Raw { xml } => {
                let Some(mut fragment) = open_fragment(xml) else {
                    continue;
                };
                let inline = fragment.inline_slots();
                resolve_slots(&mut fragment, &inline, values);
                resolve_nested(&mut fragment, values);
                if let Some(rewritten) = write_fragment(&fragment) {
                    *xml = rewritten;
                }
            }
            Block::PageBreak => {}
        }
    }
}

/// A piece of paragraph text: a run, or a text node inside raw content.
#[derive(Clone, Copy)]
enum Piece {
    Run(usize),
    Slot(usize, usize),
}

fn apply(paragraph: &mut Paragraph, values: &Substitutions) {
    let mut fragments: Vec<(usize, Fragment)> = Vec::new();
    let mut pieces = Vec::new();
    for (index, item) in paragraph.content.iter().enumerate() {
        match item {
            InlineContent::Text(_) => pieces.push(Piece::Run(index)),
            InlineContent::Raw(xml) => {
                if let Some(fragment) = open_fragment(xml) {
                    let f = fragments.len();
                    pieces.extend(fragment.inline_slots().into_iter().map(|s| Piece::Slot(f, s)));
                    fragments.push((index, fragment));
                }
            }
        }
    }

    let resolved = {
        let texts: Vec<&str> = pieces
            .iter()
            .map(|piece| match *piece {
                Piece::Run(i) => match &paragraph.content[i] {
                    InlineContent::Text(run) => run.text.as_str(),
                    InlineContent::Raw(_) => "",
                },
                Piece::Slot(f, s) => fragments[f].1.text(s),
            })
            .collect();
        redistribute(&texts, values)
    };

    if let Some(resolved) = resolved {
        for (piece, text) in pieces.into_iter().zip(resolved) {
            match piece {
                Piece::Run(i) => {
                    if let InlineContent::Text(run) = &mut paragraph.content[i] {
                        run.text = text;
                    }
                }
                Piece::Slot(f, s) => fragments[f].1.set_text(s, text),
            }
        }
    }

    for (index, mut fragment) in fragments {
        resolve_nested(&mut fragment, values);
        if let Some(rewritten) = write_fragment(&fragment) {
            paragraph.content[index] = InlineContent::Raw(rewritten);
        }
    }
}

/// Each paragraph inside a fragment resolves on its own.
fn resolve_nested(fragment: &mut Fragment, values: &Substitutions) {
    for slots in fragment.paragraph_slots() {
        resolve_slots(fragment, &slots, values);
    }
}

fn resolve_slots(fragment: &mut Fragment, slots: &[usize], values: &Substitutions) {
    let resolved = {
        let texts: Vec<&str> = slots.iter().map(|&s| fragment.text(s)).collect();
        redistribute(&texts, values)
    };
    if let Some(resolved) = resolved {
        for (&slot, text) in slots.iter().zip(resolved) {
            fragment.set_text(slot, text);
        }
    }
}

fn open_fragment(xml: &str) -> Option<Fragment> {
    if !Fragment::may_contain_text(xml) {
        return None;
    }
    match Fragment::parse(xml) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            log::debug!("Skipping unreadable raw content: {}", e);
            None
        }
    }
}

fn write_fragment(fragment: &Fragment) -> Option<String> {
    if !fragment.is_changed() {
        return None;
    }
    match fragment.to_xml() {
        Ok(xml) => Some(xml),
        Err(e) => {
            log::warn!("Keeping raw content unmerged: {}", e);
            None
        }
    }
}

fn collect_placeholders(document: &Document) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    visit_text(&document.blocks, &mut |text| {
        for placeholder in scanner().scan(text) {
            if !names.contains(&placeholder.name) {
                names.push(placeholder.name);
            }
        }
    });
    names
}

/// Visit the text of every paragraph, including paragraphs held in raw
/// content, the way [`apply_blocks`] sees it.
fn visit_text(blocks: &[Block], f: &mut impl FnMut(&str)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                let mut text = String::new();
                let mut nested = Vec::new();
                for item in &p.content {
                    match item {
                        InlineContent::Text(run) => text.push_str(&run.text),
                        InlineContent::Raw(xml) => {
                            if let Some(fragment) = open_fragment(xml) {
                                let (inline, paragraphs) = fragment.texts();
                                text.push_str(&inline);
                                nested.extend(paragraphs);
                            }
                        }
                    }
                }
                f(text.as_str());
                for t in &nested {
                    f(t.as_str());
                }
            }
            Block::Table(t) => {
                for cell in t.rows.iter().flat_map(|r| &r.cells) {
                    visit_text(&cell.content, f);
                }
            }
            Block::Raw { xml } => {
                if let Some(fragment) = open_fragment(xml) {
                    let (inline, paragraphs) = fragment.texts();
                    f(inline.as_str());
                    for t in &paragraphs {
                        f(t.as_str());
                    }
                }
            }
            Block::PageBreak => {}
        }
    }
}
