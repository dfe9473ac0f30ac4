//! Text nodes inside XML that the model keeps verbatim.
//!
//! Content controls, tracked insertions, hyperlinks, simple fields and text
//! boxes stay raw in the document model. Their `w:t` text still has to take
//! part in merging, so a raw fragment can be opened up here, its text edited
//! in place and the fragment written back with everything else untouched.

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::Result;

use super::xml::{get_attr, into_string, is};

/// A raw XML fragment with addressable `w:t` text.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    events: Vec<Event<'static>>,
    slots: Vec<TextSlot>,
    changed: bool,
}

#[derive(Debug, Clone)]
struct TextSlot {
    /// Index of the text event
    event: usize,
    /// Index of the enclosing `w:t` start tag
    tag: usize,
    /// Innermost `w:p` of the fragment around this text, if any
    paragraph: Option<usize>,
    text: String,
}

enum Open {
    Paragraph(usize),
    Text(usize),
    Other,
}

impl Fragment {
    /// Check whether a fragment can hold text at all, without parsing it.
    pub(crate) fn may_contain_text(xml: &str) -> bool {
        xml.contains("<w:t")
    }

    /// Split a fragment into events.
    pub(crate) fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut events = Vec::new();
        let mut slots = Vec::new();
        let mut open = Vec::new();
        let mut paragraphs = 0;

        loop {
            let event = reader.read_event()?.into_owned();
            let index = events.len();
            match &event {
                Event::Start(e) => open.push(if is(e, b"w:p") {
                    paragraphs += 1;
                    Open::Paragraph(paragraphs - 1)
                } else if is(e, b"w:t") {
                    Open::Text(index)
                } else {
                    Open::Other
                }),
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(t) => {
                    if let Some(&Open::Text(tag)) = open.last() {
                        slots.push(TextSlot {
                            event: index,
                            tag,
                            paragraph: innermost_paragraph(&open),
                            text: t.unescape()?.into_owned(),
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            events.push(event);
        }

        Ok(Self {
            events,
            slots,
            changed: false,
        })
    }

    /// Text slots that belong to the paragraph around the fragment.
    pub(crate) fn inline_slots(&self) -> Vec<usize> {
        (0..self.slots.len())
            .filter(|&i| self.slots[i].paragraph.is_none())
            .collect()
    }

    /// Text slots of each paragraph nested in the fragment, such as the
    /// body of a content control or a text box.
    pub(crate) fn paragraph_slots(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(paragraph) = slot.paragraph else {
                continue;
            };
            match groups.iter_mut().find(|(id, _)| *id == paragraph) {
                Some((_, group)) => group.push(i),
                None => groups.push((paragraph, vec![i])),
            }
        }
        groups.into_iter().map(|(_, group)| group).collect()
    }

    /// Joined inline text and the joined text of each nested paragraph.
    pub(crate) fn texts(&self) -> (String, Vec<String>) {
        let join = |slots: &[usize]| -> String {
            slots.iter().map(|&s| self.slots[s].text.as_str()).collect()
        };
        let nested = self
            .paragraph_slots()
            .iter()
            .map(|group| join(group.as_slice()))
            .collect();
        (join(self.inline_slots().as_slice()), nested)
    }

    pub(crate) fn text(&self, slot: usize) -> &str {
        &self.slots[slot].text
    }

    /// Replace the text of one slot.
    pub(crate) fn set_text(&mut self, slot: usize, text: String) {
        let slot = &mut self.slots[slot];
        if slot.text == text {
            return;
        }
        self.events[slot.event] = Event::Text(BytesText::new(&text).into_owned());
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            preserve_space(&mut self.events[slot.tag]);
        }
        slot.text = text;
        self.changed = true;
    }

    /// Check if any text was replaced.
    pub(crate) fn is_changed(&self) -> bool {
        self.changed
    }

    /// Serialize the fragment back to XML.
    pub(crate) fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer.write_event(event)?;
        }
        into_string(writer)
    }
}

fn innermost_paragraph(open: &[Open]) -> Option<usize> {
    open.iter().rev().find_map(|o| match o {
        Open::Paragraph(id) => Some(*id),
        _ => None,
    })
}

fn preserve_space(event: &mut Event<'static>) {
    if let Event::Start(tag) = event {
        if get_attr(tag, b"xml:space").is_none() {
            tag.push_attribute(("xml:space", "preserve"));
        }
    }
}
