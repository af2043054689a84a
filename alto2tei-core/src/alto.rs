//! ALTO reader
//!
//! Parses one ALTO file into the small model the converter needs: the
//! source image reference, text styles, and the block/line/word layout.
//! Elements are matched by local name, so any namespace (or none) and any
//! prefix is accepted; the namespace check lives in [`crate::namespace`].

use crate::error::{ConversionError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AltoDocument {
    /// Default namespace declared on the root element
    pub namespace: Option<String>,
    /// `fileIdentifier`, else `fileName`, first non-blank value
    pub source_image: Option<String>,
    /// Printed page number, else physical image number, of the first Page
    pub page_number: Option<String>,
    pub styles: HashMap<String, TextStyle>,
    /// Blocks in document order, nested ComposedBlocks flattened
    pub blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStyle {
    pub size: Option<f32>,
    /// FONTSTYLE tokens: bold, italics, subscript, superscript, smallcaps, underline
    pub font_styles: Vec<String>,
    pub fixed_width: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TextBlock {
    pub style_refs: Vec<String>,
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub geometry: LineGeometry,
    pub polygon_points: String,
    pub style_refs: Vec<String>,
    pub items: Vec<LineItem>,
}

/// Attribute text of a line, empty when absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineGeometry {
    pub id: String,
    pub hpos: String,
    pub vpos: String,
    pub width: String,
    pub height: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineItem {
    Word(Word),
    Space,
    Hyphen,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Word {
    pub content: String,
    pub style_refs: Vec<String>,
    /// Inline STYLE attribute tokens
    pub font_styles: Vec<String>,
}

impl TextLine {
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.items.iter().filter_map(|item| match item {
            LineItem::Word(word) => Some(word),
            _ => None,
        })
    }
}

impl AltoDocument {
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks.iter().flat_map(|block| block.lines.iter())
    }

    /// The style of the first level (innermost first) that references a TextStyle
    pub fn effective_style(&self, levels: &[&[String]]) -> Option<&TextStyle> {
        levels
            .iter()
            .find_map(|refs| refs.iter().find_map(|id| self.styles.get(id)))
    }
}

/// Parse one ALTO file. `source` names the file in error messages.
pub fn parse(source: &str, content: &[u8]) -> Result<AltoDocument> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();
    let mut parser = AltoParser::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.open(&e, false),
            Ok(Event::Empty(e)) => parser.open(&e, true),
            Ok(Event::End(_)) => parser.close(),
            Ok(Event::Text(t)) => {
                if parser.capture.is_some() {
                    let text = t
                        .unescape()
                        .map_err(|e| ConversionError::xml(source, e))?;
                    parser.captured.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if parser.capture.is_some() {
                    parser
                        .captured
                        .push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ConversionError::xml(source, e)),
        }
        buf.clear();
    }

    Ok(parser.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageField {
    FileIdentifier,
    FileName,
}

const GEOMETRY_ATTRIBUTES: [&[u8]; 5] = [b"ID", b"HPOS", b"VPOS", b"WIDTH", b"HEIGHT"];

/// A line being read: its own geometry attributes, and the first value of
/// each found on any descendant, used when the line lacks its own.
#[derive(Debug, Default)]
struct LineBuilder {
    own: [Option<String>; 5],
    descendant: [Option<String>; 5],
    polygon: Option<String>,
    style_refs: Vec<String>,
    items: Vec<LineItem>,
}

impl LineBuilder {
    fn new(e: &BytesStart) -> Self {
        Self {
            own: GEOMETRY_ATTRIBUTES.map(|key| attribute(e, key)),
            style_refs: style_refs(e),
            ..Self::default()
        }
    }

    fn note_descendant(&mut self, e: &BytesStart) {
        for (slot, key) in self.descendant.iter_mut().zip(GEOMETRY_ATTRIBUTES) {
            if slot.is_none() {
                *slot = attribute(e, key);
            }
        }
    }

    fn build(self) -> TextLine {
        let mut resolved = self.own;
        for (slot, descendant) in resolved.iter_mut().zip(self.descendant) {
            if slot.is_none() {
                *slot = descendant;
            }
        }
        let [id, hpos, vpos, width, height] = resolved.map(Option::unwrap_or_default);

        TextLine {
            geometry: LineGeometry {
                id,
                hpos,
                vpos,
                width,
                height,
            },
            polygon_points: self.polygon.unwrap_or_default(),
            style_refs: self.style_refs,
            items: self.items,
        }
    }
}

#[derive(Debug, Default)]
struct AltoParser {
    doc: AltoDocument,
    stack: Vec<String>,
    root_seen: bool,
    page_seen: bool,
    block: Option<TextBlock>,
    line: Option<LineBuilder>,
    capture: Option<ImageField>,
    captured: String,
    file_identifier: Option<String>,
    file_name: Option<String>,
}

impl AltoParser {
    fn open(&mut self, e: &BytesStart, empty: bool) {
        let name = local_name(e);

        if !self.root_seen {
            self.root_seen = true;
            self.doc.namespace = attribute(e, b"xmlns");
        }

        if let Some(line) = self.line.as_mut() {
            line.note_descendant(e);
        }

        match name.as_str() {
            "TextStyle" => {
                if let Some(id) = attribute(e, b"ID") {
                    self.doc.styles.insert(id, text_style(e));
                }
            }
            "Page" if !self.page_seen => {
                self.page_seen = true;
                self.doc.page_number = attribute(e, b"PRINTED_IMG_NR")
                    .filter(|v| !v.trim().is_empty())
                    .or_else(|| attribute(e, b"PHYSICAL_IMG_NR"))
                    .filter(|v| !v.trim().is_empty());
            }
            "TextBlock" if !empty => {
                self.finish_block();
                self.block = Some(TextBlock {
                    style_refs: style_refs(e),
                    lines: Vec::new(),
                });
            }
            "TextLine" => {
                self.line = Some(LineBuilder::new(e));
                if empty {
                    self.finish_line();
                }
            }
            "Polygon" if self.parent_is(&["TextLine", "Shape"]) => {
                if let Some(line) = self.line.as_mut() {
                    if line.polygon.is_none() {
                        line.polygon = attribute(e, b"POINTS");
                    }
                }
            }
            "String" => self.push_item(LineItem::Word(Word {
                content: attribute(e, b"CONTENT").unwrap_or_default(),
                style_refs: style_refs(e),
                font_styles: tokens(attribute(e, b"STYLE")),
            })),
            "SP" => self.push_item(LineItem::Space),
            "HYP" => self.push_item(LineItem::Hyphen),
            "fileIdentifier" | "fileName"
                if !empty && self.parent_is(&["Description", "sourceImageInformation"]) =>
            {
                self.capture = Some(if name == "fileIdentifier" {
                    ImageField::FileIdentifier
                } else {
                    ImageField::FileName
                });
                self.captured.clear();
            }
            _ => {}
        }

        if !empty {
            self.stack.push(name);
        }
    }

    fn close(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };
        match name.as_str() {
            "TextLine" => self.finish_line(),
            "TextBlock" => self.finish_block(),
            "fileIdentifier" | "fileName" => {
                if let Some(field) = self.capture.take() {
                    let value = self.captured.trim();
                    let slot = match field {
                        ImageField::FileIdentifier => &mut self.file_identifier,
                        ImageField::FileName => &mut self.file_name,
                    };
                    if slot.is_none() && !value.is_empty() {
                        *slot = Some(value.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fn parent_is(&self, path: &[&str]) -> bool {
        self.stack.len() >= path.len()
            && self.stack[self.stack.len() - path.len()..]
                .iter()
                .zip(path)
                .all(|(a, b)| a == b)
    }

    fn push_item(&mut self, item: LineItem) {
        if let Some(line) = self.line.as_mut() {
            line.items.push(item);
        }
    }

    fn finish_line(&mut self) {
        let Some(line) = self.line.take() else {
            return;
        };
        let line = line.build();
        match self.block.as_mut() {
            Some(block) => block.lines.push(line),
            // A line outside any block forms its own
            None => self.doc.blocks.push(TextBlock {
                style_refs: Vec::new(),
                lines: vec![line],
            }),
        }
    }

    fn finish_block(&mut self) {
        if let Some(block) = self.block.take() {
            self.doc.blocks.push(block);
        }
    }

    fn finish(mut self) -> AltoDocument {
        self.finish_line();
        self.finish_block();
        self.doc.source_image = self.file_identifier.or(self.file_name);
        self.doc
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn tokens(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn style_refs(e: &BytesStart) -> Vec<String> {
    tokens(attribute(e, b"STYLEREFS"))
}

fn text_style(e: &BytesStart) -> TextStyle {
    TextStyle {
        size: attribute(e, b"FONTSIZE").and_then(|v| v.trim().parse().ok()),
        font_styles: tokens(attribute(e, b"FONTSTYLE")),
        fixed_width: attribute(e, b"FONTWIDTH").is_some_and(|v| v.trim() == "fixed"),
    }
}
