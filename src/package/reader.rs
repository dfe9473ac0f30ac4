//! WordprocessingML parts → document model.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::model::{
    Alignment, Block, InlineContent, Metadata, NumberingRef, Paragraph, ParagraphStyle, Resource,
    ResourceKind, Table, TableCell, TableRow, TextRun, TextStyle,
};

use super::xml::{capture, find_val, get_attr, into_string, is, is_val_off};

/// Parsed `word/document.xml`.
pub(crate) struct MainPart {
    /// Everything before `<w:body>`: declaration, root tag, background
    pub head: String,
    /// Body content
    pub blocks: Vec<Block>,
    /// Body-level section properties
    pub section: Option<String>,
}

/// The parts of a resource part that are not resources themselves.
#[derive(Debug, Clone, Default)]
pub(crate) struct PartLayout {
    /// Declaration and root start tag
    pub head: String,
    /// Non-resource children before the first resource
    pub before: String,
    /// Non-resource children after the first resource
    pub after: String,
    /// Root end tag
    pub close: String,
}

/// Parse the main document part.
pub(crate) fn read_main_part(xml: &str) -> Result<MainPart> {
    let mut reader = Reader::from_str(xml);
    let mut head = Writer::new(Vec::new());

    loop {
        match reader.read_event()? {
            Event::Start(e) if is(&e, b"w:body") => {
                let (blocks, section) = read_blocks(&mut reader, b"w:sectPr")?;
                return Ok(MainPart {
                    head: into_string(head)?,
                    blocks,
                    section,
                });
            }
            Event::Empty(e) if is(&e, b"w:body") => {
                return Ok(MainPart {
                    head: into_string(head)?,
                    blocks: Vec::new(),
                    section: None,
                });
            }
            Event::Eof => {
                return Err(Error::Xml(
                    "word/document.xml has no w:body element".into(),
                ))
            }
            event => head.write_event(event)?,
        }
    }
}

/// Read block-level children until the enclosing end tag.
///
/// Children named `props` are returned separately instead of as blocks
/// (`w:sectPr` for the body, `w:tcPr` for cells).
fn read_blocks<'a>(
    reader: &mut Reader<&'a [u8]>,
    props: &[u8],
) -> Result<(Vec<Block>, Option<String>)> {
    let mut blocks = Vec::new();
    let mut properties = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is(&e, b"w:p") {
                    blocks.push(Block::Paragraph(read_paragraph(reader)?));
                } else if is(&e, b"w:tbl") {
                    blocks.push(Block::Table(read_table(reader)?));
                } else if is(&e, props) {
                    properties = Some(capture(reader, Event::Start(e))?);
                } else {
                    let xml = capture(reader, Event::Start(e))?;
                    blocks.push(Block::Raw { xml });
                }
            }
            Event::Empty(e) => {
                if is(&e, b"w:p") {
                    blocks.push(Block::Paragraph(Paragraph::new()));
                } else if is(&e, props) {
                    properties = Some(capture(reader, Event::Empty(e))?);
                } else {
                    let xml = capture(reader, Event::Empty(e))?;
                    blocks.push(Block::Raw { xml });
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }

    Ok((blocks, properties))
}

fn read_paragraph<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Paragraph> {
    let mut paragraph = Paragraph::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is(&e, b"w:pPr") {
                    let xml = capture(reader, Event::Start(e))?;
                    paragraph.style = paragraph_style(xml);
                } else if is(&e, b"w:r") {
                    let xml = capture(reader, Event::Start(e))?;
                    paragraph.content.push(interpret_run(xml)?);
                } else {
                    let xml = capture(reader, Event::Start(e))?;
                    paragraph.content.push(InlineContent::Raw(xml));
                }
            }
            Event::Empty(e) => {
                if is(&e, b"w:pPr") {
                    let xml = capture(reader, Event::Empty(e))?;
                    paragraph.style = paragraph_style(xml);
                } else if is(&e, b"w:r") {
                    paragraph.content.push(InlineContent::Text(TextRun::new("")));
                } else {
                    let xml = capture(reader, Event::Empty(e))?;
                    paragraph.content.push(InlineContent::Raw(xml));
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }

    Ok(paragraph)
}

fn paragraph_style(xml: String) -> ParagraphStyle {
    let numbering = find_val(&xml, b"w:numId").map(|num_id| NumberingRef {
        num_id,
        level: find_val(&xml, b"w:ilvl")
            .and_then(|l| l.parse().ok())
            .unwrap_or(0),
    });

    ParagraphStyle {
        style_id: find_val(&xml, b"w:pStyle"),
        alignment: find_val(&xml, b"w:jc")
            .map(|jc| Alignment::from_jc(&jc))
            .unwrap_or_default(),
        numbering,
        properties_xml: Some(xml),
    }
}

/// Turn a captured `w:r` into a text run, or keep it verbatim when it holds
/// anything besides text, tabs and line breaks.
fn interpret_run(xml: String) -> Result<InlineContent> {
    Ok(match parse_text_run(&xml)? {
        Some(run) => InlineContent::Text(run),
        None => InlineContent::Raw(xml),
    })
}

fn parse_text_run(xml: &str) -> Result<Option<TextRun>> {
    let mut reader = Reader::from_str(xml);
    let mut run = TextRun::new("");

    // Skip the opening <w:r>.
    reader.read_event()?;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is(&e, b"w:rPr") {
                    let props = capture(&mut reader, Event::Start(e))?;
                    run.style = run_style(props);
                } else if is(&e, b"w:t") {
                    read_text(&mut reader, &mut run.text)?;
                } else {
                    return Ok(None);
                }
            }
            Event::Empty(e) => {
                if is(&e, b"w:rPr") {
                    run.style.properties_xml = Some(capture(&mut reader, Event::Empty(e))?);
                } else if is(&e, b"w:tab") {
                    run.text.push('\t');
                } else if is(&e, b"w:br") {
                    match get_attr(&e, b"w:type").as_deref() {
                        None | Some("textWrapping") => run.text.push('\n'),
                        _ => return Ok(None),
                    }
                } else if is(&e, b"w:cr") {
                    run.text.push('\n');
                } else if is(&e, b"w:t") || is(&e, b"w:lastRenderedPageBreak") {
                    // Empty text or a layout cache hint.
                } else {
                    return Ok(None);
                }
            }
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    Ok(Some(run))
}

fn read_text<'a>(reader: &mut Reader<&'a [u8]>, out: &mut String) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::CData(c) => out.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn run_style(xml: String) -> TextStyle {
    let mut style = TextStyle::default();
    let mut reader = Reader::from_str(&xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if is(&e, b"w:b") {
                    style.bold = !is_val_off(&e);
                } else if is(&e, b"w:i") {
                    style.italic = !is_val_off(&e);
                } else if is(&e, b"w:u") {
                    style.underline = get_attr(&e, b"w:val").as_deref() != Some("none");
                } else if is(&e, b"w:rStyle") {
                    style.style_ref = get_attr(&e, b"w:val");
                } else if is(&e, b"w:rPrChange") {
                    // Tracked previous formatting; the current one is above.
                    break;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    style.properties_xml = Some(xml);
    style
}

fn read_table<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Table> {
    let mut table = Table::new();
    let mut props = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is(&e, b"w:tr") {
                    table.add_row(read_row(reader)?);
                } else {
                    let is_tbl_pr = is(&e, b"w:tblPr");
                    let xml = capture(reader, Event::Start(e))?;
                    if is_tbl_pr {
                        table.style_id = find_val(&xml, b"w:tblStyle");
                    }
                    props.push_str(&xml);
                }
            }
            Event::Empty(e) => {
                if is(&e, b"w:tr") {
                    table.add_row(TableRow::new(Vec::new()));
                } else {
                    props.push_str(&capture(reader, Event::Empty(e))?);
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }

    table.properties_xml = (!props.is_empty()).then_some(props);
    Ok(table)
}

fn read_row<'a>(reader: &mut Reader<&'a [u8]>) -> Result<TableRow> {
    let mut row = TableRow::new(Vec::new());
    let mut props = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is(&e, b"w:tc") {
                    let (content, properties_xml) = read_blocks(reader, b"w:tcPr")?;
                    row.cells.push(TableCell {
                        content,
                        properties_xml,
                    });
                } else {
                    props.push_str(&capture(reader, Event::Start(e))?);
                }
            }
            Event::Empty(e) => {
                if is(&e, b"w:tc") {
                    row.cells.push(TableCell::empty());
                } else {
                    props.push_str(&capture(reader, Event::Empty(e))?);
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }

    row.properties_xml = (!props.is_empty()).then_some(props);
    Ok(row)
}

fn unexpected_eof() -> Error {
    Error::Xml("unexpected end of word/document.xml".into())
}

/// Classifier picking resource elements out of a part's root children.
pub(crate) type Classifier = fn(&BytesStart) -> Option<(ResourceKind, String)>;

/// `w:style` elements of `word/styles.xml`.
pub(crate) fn classify_style(e: &BytesStart) -> Option<(ResourceKind, String)> {
    if is(e, b"w:style") {
        get_attr(e, b"w:styleId").map(|id| (ResourceKind::Style, id))
    } else {
        None
    }
}

/// `w:abstractNum` and `w:num` elements of `word/numbering.xml`.
pub(crate) fn classify_numbering(e: &BytesStart) -> Option<(ResourceKind, String)> {
    if is(e, b"w:abstractNum") {
        get_attr(e, b"w:abstractNumId").map(|id| (ResourceKind::AbstractNumbering, id))
    } else if is(e, b"w:num") {
        get_attr(e, b"w:numId").map(|id| (ResourceKind::Numbering, id))
    } else {
        None
    }
}

/// Split a resource part into its layout and its resource definitions.
pub(crate) fn read_resource_part(
    xml: &str,
    classify: Classifier,
) -> Result<(PartLayout, Vec<Resource>)> {
    let mut reader = Reader::from_str(xml);
    let mut head = Writer::new(Vec::new());
    let mut layout = PartLayout::default();
    let mut resources = Vec::new();

    // Declaration and root start tag.
    let root = loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                head.write_event(Event::Start(e))?;
                break name;
            }
            Event::Eof => return Err(Error::Xml("resource part has no root element".into())),
            event => head.write_event(event)?,
        }
    };
    layout.head = into_string(head)?;
    layout.close = format!("</{}>", root);

    loop {
        let event = reader.read_event()?;
        let element = match &event {
            Event::Start(e) | Event::Empty(e) => Some(classify(e)),
            Event::End(_) | Event::Eof => break,
            _ => None,
        };
        let Some(classified) = element else {
            continue;
        };

        let xml = capture(&mut reader, event)?;
        match classified {
            Some((kind, id)) => resources.push(Resource::new(kind, id, xml)),
            None if resources.is_empty() => layout.before.push_str(&xml),
            None => layout.after.push_str(&xml),
        }
    }

    Ok((layout, resources))
}

/// Read title, author and dates from `docProps/core.xml`.
///
/// Core properties are informational, so malformed content yields whatever
/// was read before the error.
pub(crate) fn read_core_properties(xml: &str) -> Metadata {
    let mut metadata = Metadata::default();
    let mut reader = Reader::from_str(xml);
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::Text(t)) => {
                let Some(ref name) = current else { continue };
                let Ok(text) = t.unescape() else { continue };
                let text = text.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match name.as_slice() {
                    b"dc:title" => metadata.title = Some(text),
                    b"dc:creator" => metadata.author = Some(text),
                    b"dc:subject" => metadata.subject = Some(text),
                    b"dcterms:created" => metadata.created = parse_datetime(&text),
                    b"dcterms:modified" => metadata.modified = parse_datetime(&text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    metadata
}

fn parse_datetime(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#;

    fn main_part(body: &str) -> MainPart {
        let xml = format!("{HEAD}<w:body>{body}</w:body></w:document>");
        read_main_part(&xml).unwrap()
    }

    #[test]
    fn test_head_and_section_preserved() {
        let part = main_part(
            r#"<w:p><w:r><w:t>Hi</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#,
        );
        assert_eq!(part.head, HEAD);
        assert_eq!(part.blocks.len(), 1);
        assert_eq!(
            part.section.as_deref(),
            Some(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#)
        );
    }

    #[test]
    fn test_run_formatting() {
        let part = main_part(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:rStyle w:val="Strong"/><w:b/><w:i w:val="0"/><w:u w:val="single"/></w:rPr><w:t xml:space="preserve">Dear </w:t></w:r><w:r><w:t>{{Name}}</w:t></w:r></w:p>"#,
        );
        let Block::Paragraph(ref p) = part.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.style.style_id.as_deref(), Some("Heading1"));
        assert_eq!(p.style.alignment, Alignment::Center);

        let runs: Vec<_> = p.runs().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Dear ");
        assert!(runs[0].style.bold);
        assert!(!runs[0].style.italic);
        assert!(runs[0].style.underline);
        assert_eq!(runs[0].style.style_ref.as_deref(), Some("Strong"));
        assert_eq!(runs[1].text, "{{Name}}");
        assert!(!runs[1].style.has_styling());
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let part = main_part(
            r#"<w:p><w:r><w:t>A&amp;B</w:t><w:tab/><w:t>C</w:t><w:br/><w:t>D</w:t><w:lastRenderedPageBreak/></w:r></w:p>"#,
        );
        let p = part.blocks[0].as_paragraph().unwrap();
        assert_eq!(p.plain_text(), "A&B\tC\nD");
    }

    #[test]
    fn test_non_text_runs_kept_raw() {
        let part = main_part(
            r#"<w:p><w:proofErr w:type="spellStart"/><w:r><w:br w:type="page"/></w:r><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:hyperlink r:id="rId5"><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let p = part.blocks[0].as_paragraph().unwrap();
        assert_eq!(p.content.len(), 4);
        assert_eq!(p.run_count(), 0);
        assert!(matches!(p.content[1], InlineContent::Raw(ref x) if x.contains("w:type=\"page\"")));
    }

    #[test]
    fn test_table_with_nested_blocks() {
        let part = main_part(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr><w:tblGrid><w:gridCol w:w="100"/></w:tblGrid><w:tr><w:trPr><w:cantSplit/></w:trPr><w:tc><w:tcPr><w:tcW w:w="100" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>{{A}}</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl><w:p/></w:tc><w:tc/></w:tr></w:tbl>"#,
        );
        let table = part.blocks[0].as_table().unwrap();
        assert_eq!(table.style_id.as_deref(), Some("TableGrid"));
        assert!(table.properties_xml.as_ref().unwrap().contains("w:gridCol"));
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_count(), 2);

        let row = &table.rows[0];
        assert_eq!(row.properties_xml.as_deref(), Some("<w:trPr><w:cantSplit/></w:trPr>"));
        let cell = &row.cells[0];
        assert!(cell.properties_xml.as_ref().unwrap().contains("w:tcW"));
        assert_eq!(cell.content.len(), 3);
        assert!(matches!(cell.content[1], Block::Table(_)));
        assert!(row.cells[1].content.is_empty());
    }

    #[test]
    fn test_unknown_body_elements_raw() {
        let part = main_part(r#"<w:bookmarkStart w:id="0" w:name="x"/><w:sdt><w:sdtContent><w:p/></w:sdtContent></w:sdt>"#);
        assert_eq!(part.blocks.len(), 2);
        assert!(matches!(part.blocks[1], Block::Raw { ref xml } if xml.starts_with("<w:sdt>")));
    }

    #[test]
    fn test_missing_body() {
        assert!(read_main_part(&format!("{HEAD}</w:document>")).is_err());
    }

    #[test]
    fn test_read_styles_part() {
        let xml = r#"<?xml version="1.0"?><w:styles xmlns:w="x"><w:docDefaults><w:rPrDefault/></w:docDefaults><w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="character" w:styleId="Strong"/></w:styles>"#;
        let (layout, resources) = read_resource_part(xml, classify_style).unwrap();
        assert_eq!(layout.head, r#"<?xml version="1.0"?><w:styles xmlns:w="x">"#);
        assert_eq!(layout.before, "<w:docDefaults><w:rPrDefault/></w:docDefaults>");
        assert!(layout.after.is_empty());
        assert_eq!(layout.close, "</w:styles>");
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].id, "Normal");
        assert_eq!(resources[1].xml, r#"<w:style w:type="character" w:styleId="Strong"/>"#);
    }

    #[test]
    fn test_read_numbering_part() {
        let xml = r#"<w:numbering><w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"/></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num><w:numIdMacAtCleanup w:val="1"/></w:numbering>"#;
        let (layout, resources) = read_resource_part(xml, classify_numbering).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].kind, ResourceKind::AbstractNumbering);
        assert_eq!(resources[1].kind, ResourceKind::Numbering);
        assert_eq!(resources[1].id, "1");
        assert_eq!(layout.after, r#"<w:numIdMacAtCleanup w:val="1"/>"#);
    }

    #[test]
    fn test_core_properties() {
        let xml = r#"<cp:coreProperties><dc:title>Invitation</dc:title><dc:creator>Office</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">2024-03-01T10:00:00Z</dcterms:created></cp:coreProperties>"#;
        let metadata = read_core_properties(xml);
        assert_eq!(metadata.title.as_deref(), Some("Invitation"));
        assert_eq!(metadata.author.as_deref(), Some("Office"));
        assert!(metadata.created.is_some());
        assert!(metadata.modified.is_none());
    }
}
