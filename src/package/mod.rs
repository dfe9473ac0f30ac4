//! DOCX package reading and writing.
//!
//! A [`DocxPackage`] holds every part of the zip container. The parts that
//! the merge engine edits (`word/document.xml`, `word/styles.xml`,
//! `word/numbering.xml`) are parsed into the [`Document`] model; everything
//! else (headers, footers, images, relationships, settings) is carried over
//! byte-for-byte when a document is written.

pub(crate) mod fragment;
mod options;
mod reader;
mod writer;
pub(crate) mod xml;

pub use options::{ErrorMode, ParseOptions};

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::detect::{detect_format_from_bytes, DocumentFormat};
use crate::error::{Error, Result};
use crate::model::{Document, Resource, ResourceTable};

use reader::{
    classify_numbering, classify_style, read_core_properties, read_main_part, read_resource_part,
    Classifier, PartLayout,
};
use writer::{numbering_order, write_main_part, write_resource_part};

const CONTENT_TYPES: &str = "[Content_Types].xml";
const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const CORE_PART: &str = "docProps/core.xml";

/// A single zip entry.
#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// The zip container of a word-processing document.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    parts: Vec<Part>,
    format: DocumentFormat,
    main_head: String,
    section: Option<String>,
    styles: Option<PartLayout>,
    numbering: Option<PartLayout>,
}

impl DocxPackage {
    /// Read a package from bytes and parse its content.
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<(Self, Document)> {
        detect_format_from_bytes(data)?;

        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let limit = options.max_part_bytes();
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            if let Some(limit) = limit {
                if file.size() > limit {
                    return Err(Error::Zip(format!(
                        "part '{}' exceeds the size limit ({} bytes)",
                        file.name(),
                        file.size()
                    )));
                }
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push(Part {
                name: file.name().to_string(),
                data,
            });
        }

        let mut package = DocxPackage {
            parts,
            format: DocumentFormat::Docx,
            main_head: String::new(),
            section: None,
            styles: None,
            numbering: None,
        };

        if let Some(types) = package.part_text(CONTENT_TYPES) {
            package.format = DocumentFormat::from_content_types(types?);
        }

        let main = match package.part_text(DOCUMENT_PART) {
            Some(xml) => read_main_part(xml?)?,
            None => {
                return Err(Error::Zip(format!(
                    "package has no {} part",
                    DOCUMENT_PART
                )))
            }
        };

        let mut resources = ResourceTable::new();
        package.styles =
            package.read_resources(STYLES_PART, classify_style, options, &mut resources)?;
        package.numbering =
            package.read_resources(NUMBERING_PART, classify_numbering, options, &mut resources)?;

        let metadata = match package.part_text(CORE_PART) {
            Some(Ok(xml)) if options.read_metadata => read_core_properties(xml),
            _ => Default::default(),
        };

        package.main_head = main.head;
        package.section = main.section;

        log::debug!(
            "Parsed {} package: {} parts, {} blocks, {} resources",
            package.format,
            package.parts.len(),
            main.blocks.len(),
            resources.len()
        );

        let document = Document {
            metadata,
            blocks: main.blocks,
            resources,
        };
        Ok((package, document))
    }

    /// Read and parse a package file.
    pub fn read_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<(Self, Document)> {
        let data = fs::read(path)?;
        Self::parse(&data, options)
    }

    /// A minimal package with empty styles and numbering parts, used for
    /// documents built in code.
    pub fn blank() -> Self {
        let styles = PartLayout {
            head: format!(
                r#"{}<w:styles xmlns:w="{}">"#,
                XML_DECLARATION,
                xml::W_NS
            ),
            close: "</w:styles>".into(),
            ..Default::default()
        };
        let numbering = PartLayout {
            head: format!(
                r#"{}<w:numbering xmlns:w="{}">"#,
                XML_DECLARATION,
                xml::W_NS
            ),
            close: "</w:numbering>".into(),
            ..Default::default()
        };

        let format = DocumentFormat::Docx;
        let content_types = format!(
            concat!(
                r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Override PartName="/word/document.xml" ContentType="{}"/>"#,
                r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
                r#"<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#,
                "</Types>"
            ),
            XML_DECLARATION,
            format.main_content_type()
        );
        let package_rels = format!(
            concat!(
                r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                r#"<Relationship Id="rId1" Type="{}/officeDocument" Target="word/document.xml"/>"#,
                "</Relationships>"
            ),
            XML_DECLARATION,
            xml::R_NS
        );
        let document_rels = format!(
            concat!(
                r#"{}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                r#"<Relationship Id="rId1" Type="{rel}/styles" Target="styles.xml"/>"#,
                r#"<Relationship Id="rId2" Type="{rel}/numbering" Target="numbering.xml"/>"#,
                "</Relationships>"
            ),
            XML_DECLARATION,
            rel = xml::R_NS
        );

        let part = |name: &str, data: String| Part {
            name: name.to_string(),
            data: data.into_bytes(),
        };

        DocxPackage {
            parts: vec![
                part(CONTENT_TYPES, content_types),
                part("_rels/.rels", package_rels),
                part(DOCUMENT_PART, String::new()),
                part("word/_rels/document.xml.rels", document_rels),
                part(STYLES_PART, String::new()),
                part(NUMBERING_PART, String::new()),
            ],
            format,
            main_head: format!(
                r#"{}<w:document xmlns:w="{}" xmlns:r="{}">"#,
                XML_DECLARATION,
                xml::W_NS,
                xml::R_NS
            ),
            section: Some(DEFAULT_SECTION.to_string()),
            styles: Some(styles),
            numbering: Some(numbering),
        }
    }

    /// Package format from the main part content type.
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Names of all parts in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Header and footer parts as text, skipping any that are not UTF-8.
    ///
    /// These parts are copied into every output unchanged.
    pub fn header_footer_parts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts
            .iter()
            .filter(|p| is_header_footer(&p.name))
            .filter_map(|p| {
                std::str::from_utf8(&p.data)
                    .ok()
                    .map(|xml| (p.name.as_str(), xml))
            })
    }

    /// Raw bytes of a part as stored in the package.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Serialize a document into a complete package.
    ///
    /// The document's blocks and resources replace the main, styles and
    /// numbering parts; all other parts are copied unchanged, except that a
    /// template's main content type is switched to a regular document.
    pub fn write(&self, document: &Document) -> Result<Vec<u8>> {
        if self.numbering.is_none() && document.resources.iter().any(Resource::is_numbering) {
            log::warn!("Package has no numbering part; numbering definitions are dropped");
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            let regenerated = match part.name.as_str() {
                DOCUMENT_PART => Some(write_main_part(
                    Some(self.main_head.as_str()),
                    &document.blocks,
                    self.section.as_deref(),
                )),
                STYLES_PART => self.styles.as_ref().map(|layout| {
                    write_resource_part(layout, document.resources.iter().filter(|r| r.is_style()))
                }),
                NUMBERING_PART => self
                    .numbering
                    .as_ref()
                    .map(|layout| write_resource_part(layout, numbering_order(&document.resources))),
                CONTENT_TYPES if self.format.output_format() != self.format => {
                    let xml = String::from_utf8_lossy(&part.data);
                    Some(xml.replace(
                        self.format.main_content_type(),
                        self.format.output_format().main_content_type(),
                    ))
                }
                _ => None,
            };

            zip.start_file(part.name.as_str(), options)?;
            match regenerated {
                Some(xml) => zip.write_all(xml.as_bytes())?,
                None => zip.write_all(&part.data)?,
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Write a document to `path`.
    ///
    /// The package is written to a temporary sibling file first and renamed
    /// into place, so a failure never leaves a truncated file at `path`.
    pub fn save<P: AsRef<Path>>(&self, document: &Document, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = self.write(document)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Other(format!("invalid output path: {}", path.display())))?;
        let mut temp_name = std::ffi::OsString::from(".");
        temp_name.push(file_name);
        temp_name.push(".tmp");
        let temp = path.with_file_name(temp_name);

        let result = fs::File::create(&temp)
            .and_then(|mut file| {
                file.write_all(&data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn part_text(&self, name: &str) -> Option<Result<&str>> {
        self.part(name).map(|data| {
            std::str::from_utf8(data)
                .map(|s| s.trim_start_matches('\u{feff}'))
                .map_err(|e| Error::Xml(format!("{}: {}", name, e)))
        })
    }

    fn read_resources(
        &self,
        name: &str,
        classify: Classifier,
        options: &ParseOptions,
        resources: &mut ResourceTable,
    ) -> Result<Option<PartLayout>> {
        let Some(text) = self.part_text(name) else {
            return Ok(None);
        };

        match text.and_then(|xml| read_resource_part(xml, classify)) {
            Ok((layout, found)) => {
                for resource in found {
                    resources.insert(resource);
                }
                Ok(Some(layout))
            }
            Err(e) if options.error_mode == ErrorMode::Lenient => {
                log::warn!("Skipping unreadable part {}: {}", name, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const DEFAULT_SECTION: &str = concat!(
    r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/>"#,
    r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>"#,
    "</w:sectPr>"
);

fn is_header_footer(name: &str) -> bool {
    (name.starts_with("word/header") || name.starts_with("word/footer")) && name.ends_with(".xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, ResourceKind};

    #[test]
    fn test_header_footer_names() {
        assert!(is_header_footer("word/header1.xml"));
        assert!(is_header_footer("word/footer2.xml"));
        assert!(!is_header_footer("word/_rels/header1.xml.rels"));
        assert!(!is_header_footer("word/document.xml"));
    }

    #[test]
    fn test_blank_package_round_trip() {
        let package = DocxPackage::blank();
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("Hello {{Name}}"));
        doc.resources.insert(Resource::style(
            "Quote",
            r#"<w:style w:type="paragraph" w:styleId="Quote"/>"#,
        ));

        let bytes = package.write(&doc).unwrap();
        let (reread, parsed) = DocxPackage::parse(&bytes, &ParseOptions::default()).unwrap();

        assert_eq!(reread.format(), DocumentFormat::Docx);
        assert_eq!(parsed.plain_text(), "Hello {{Name}}");
        assert!(parsed.resources.contains(ResourceKind::Style, "Quote"));
        assert_eq!(reread.part_names().count(), 6);
    }

    #[test]
    fn test_rejects_non_zip() {
        let result = DocxPackage::parse(b"not a zip", &ParseOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_requires_main_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<w:styles/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let result = DocxPackage::parse(&bytes, &ParseOptions::default());
        assert!(matches!(result, Err(Error::Zip(_))));
    }

    #[test]
    fn test_lenient_skips_broken_styles() {
        let package = DocxPackage::blank();
        let bytes = package.write(&Document::new()).unwrap();

        // Replace the styles part with garbage.
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            zip.start_file(name.as_str(), SimpleFileOptions::default())
                .unwrap();
            if name == STYLES_PART {
                zip.write_all(b"<w:styles><w:style>").unwrap();
            } else {
                zip.write_all(&data).unwrap();
            }
        }
        let broken = zip.finish().unwrap().into_inner();

        assert!(DocxPackage::parse(&broken, &ParseOptions::default()).is_err());
        let (lenient, _) = DocxPackage::parse(&broken, &ParseOptions::new().lenient()).unwrap();
        assert_eq!(
            lenient.part(STYLES_PART),
            Some(b"<w:styles><w:style>".as_slice())
        );
    }

    #[test]
    fn test_save_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        std::fs::write(&path, b"old").unwrap();

        let package = DocxPackage::blank();
        package
            .save(&Document::new(), &path)
            .unwrap();

        let data = std::fs::read(&path).unwrap();
        assert!(crate::detect::is_zip_bytes(&data));
        assert!(!dir.path().join(".out.docx.tmp").exists());
    }
}
