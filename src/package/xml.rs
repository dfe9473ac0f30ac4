//! Small quick-xml helpers shared by the package reader and writer.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// WordprocessingML main namespace.
pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Office document relationships namespace.
pub(crate) const R_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Check an element's qualified name.
#[inline]
pub(crate) fn is(e: &BytesStart, name: &[u8]) -> bool {
    e.name().as_ref() == name
}

/// Extract an attribute value by key from an element.
#[inline]
pub(crate) fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(std::result::Result::ok)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Check if `w:val` explicitly switches a toggle property off.
#[inline]
pub(crate) fn is_val_off(e: &BytesStart) -> bool {
    matches!(
        get_attr(e, b"w:val").as_deref(),
        Some("0") | Some("false") | Some("off")
    )
}

/// Re-serialize the element that `first` opens, including all descendants.
///
/// `first` must be the `Start` or `Empty` event just read from `reader`; on
/// return the reader is positioned after the matching end tag.
pub(crate) fn capture<'a>(reader: &mut Reader<&'a [u8]>, first: Event<'a>) -> Result<String> {
    let mut depth: usize = match first {
        Event::Start(_) => 1,
        _ => 0,
    };
    let mut writer = Writer::new(Vec::new());
    writer.write_event(first)?;

    while depth > 0 {
        let event = reader.read_event()?;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(Error::Xml("unexpected end of XML inside element".into())),
            _ => {}
        }
        writer.write_event(event)?;
    }

    into_string(writer)
}

/// Finish a writer into a UTF-8 string.
pub(crate) fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

/// Find the `w:val` of the first `name` element inside an XML fragment.
pub(crate) fn find_val(xml: &str, name: &[u8]) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if is(&e, name) => {
                return get_attr(&e, b"w:val");
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Escape text content and attribute values.
#[inline]
pub(crate) fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Check that a character may appear in an XML 1.0 document.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
