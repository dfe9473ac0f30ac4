//! Concatenation of rendered documents into one output document.

use crate::error::{Error, Result};
use crate::model::{Block, Document, ResourceKind};

use super::renderer::RenderedDocument;

/// Compose rendered documents, in order, into a single document.
///
/// Documents after the first are preceded by a page break, so the result of
/// composing N documents has exactly N-1 page breaks between them. Metadata
/// comes from the first document. Resources are merged by identifier: the
/// first definition wins, identical duplicates are dropped and conflicting
/// duplicates fail with [`Error::Compose`].
pub fn compose(rendered: Vec<RenderedDocument>) -> Result<Document> {
    compose_documents(rendered.into_iter().map(|r| r.document))
}

/// Compose plain documents. See [`compose`].
pub fn compose_documents<I>(documents: I) -> Result<Document>
where
    I: IntoIterator<Item = Document>,
{
    let mut documents = documents.into_iter();
    let Some(first) = documents.next() else {
        return Err(Error::Compose("no documents to compose".into()));
    };

    let mut output = first;
    let mut count = 1;
    for document in documents {
        output.resources.merge_from(&document.resources)?;
        output.blocks.push(Block::PageBreak);
        output.blocks.extend(document.blocks);
        count += 1;
    }

    warn_unresolved_references(&output);
    log::debug!(
        "Composed {} documents into {} blocks",
        count,
        output.blocks.len()
    );
    Ok(output)
}

/// Log every resource the document references but does not define.
pub(crate) fn warn_unresolved_references(document: &Document) {
    for (kind, id) in undefined_references(document) {
        log::warn!("Output references undefined {} '{}'", kind, id);
    }
}

fn undefined_references(document: &Document) -> Vec<(ResourceKind, String)> {
    document
        .referenced_resources()
        .into_iter()
        // Built-in styles such as "Normal" resolve without a definition.
        .filter(|(kind, _)| !(*kind == ResourceKind::Style && document.resources.is_empty()))
        .filter(|(kind, id)| !document.resources.contains(*kind, id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Resource};

    fn rendered(index: usize, text: &str) -> RenderedDocument {
        let mut document = Document::new();
        document.add_paragraph(Paragraph::with_text(text));
        document
            .resources
            .insert(Resource::style("Normal", "<w:style w:styleId=\"Normal\"/>"));
        RenderedDocument {
            record_index: index,
            document,
            unresolved: Vec::new(),
        }
    }

    #[test]
    fn test_page_breaks_between_documents() {
        let docs = (0..3).map(|i| rendered(i, &format!("doc {i}"))).collect();
        let composed = compose(docs).unwrap();

        assert_eq!(composed.page_break_count(), 2);
        assert!(!composed.blocks.first().unwrap().is_page_break());
        assert!(!composed.blocks.last().unwrap().is_page_break());
        let sections: Vec<String> = composed
            .sections()
            .iter()
            .map(|s| s[0].plain_text().unwrap_or_default())
            .collect();
        assert_eq!(sections, vec!["doc 0", "doc 1", "doc 2"]);
        assert_eq!(composed.resources.len(), 1);
    }

    #[test]
    fn test_single_document_has_no_break() {
        let composed = compose(vec![rendered(0, "only")]).unwrap();
        assert_eq!(composed.block_count(), 1);
        assert_eq!(composed.page_break_count(), 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(compose(Vec::new()), Err(Error::Compose(_))));
    }

    #[test]
    fn test_conflicting_resources() {
        let first = rendered(0, "a");
        let mut second = rendered(1, "b");
        second
            .document
            .resources
            .insert(Resource::style("Normal", "<w:style w:styleId=\"Normal\"><w:b/></w:style>"));

        assert!(matches!(compose(vec![first, second]), Err(Error::Compose(_))));
    }

    #[test]
    fn test_undefined_references() {
        let mut doc = rendered(0, "a").document;
        doc.add_paragraph(Paragraph::with_text("b").styled("Letterhead"));
        assert_eq!(
            undefined_references(&doc),
            vec![(ResourceKind::Style, "Letterhead".to_string())]
        );

        doc.resources = Default::default();
        assert!(undefined_references(&doc).is_empty());
    }

    #[test]
    fn test_new_resources_added() {
        let first = rendered(0, "a");
        let mut second = rendered(1, "b");
        second
            .document
            .resources
            .insert(Resource::style("Quote", "<w:style w:styleId=\"Quote\"/>"));

        let composed = compose(vec![first, second]).unwrap();
        assert!(composed.resources.contains(ResourceKind::Style, "Quote"));
        assert_eq!(composed.resources.len(), 2);
    }
}
