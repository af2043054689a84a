//! Final serialization: indentation and the atomic file write
//!
//! Indentation must not alter text. An element holding only elements gets
//! its children on their own lines, two spaces per level; an element with
//! any non-whitespace text is mixed content and is written exactly as read,
//! descendants included.

use crate::error::{ConversionError, Result};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;

const INDENT: &[u8] = b"  ";

#[derive(Debug)]
enum Node {
    Element {
        start: BytesStart<'static>,
        children: Vec<Node>,
    },
    /// Text, comment, PI, CDATA or doctype, kept as read
    Leaf(Event<'static>),
}

impl Node {
    fn is_blank(&self) -> bool {
        match self {
            Node::Leaf(Event::Text(t)) => t.iter().all(u8::is_ascii_whitespace),
            _ => false,
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, Node::Leaf(Event::Text(_)) | Node::Leaf(Event::CData(_)))
    }
}

/// Re-indent a well-formed document under a fresh UTF-8 declaration
pub fn pretty_print(xml: &str) -> Result<String> {
    let roots = parse(xml)?;

    let mut writer = Writer::new(Vec::with_capacity(xml.len() + xml.len() / 4));
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    for node in roots.iter().filter(|n| !n.is_blank()) {
        writer.get_mut().push(b'\n');
        write_node(&mut writer, node, 0)?;
    }
    writer.get_mut().push(b'\n');

    String::from_utf8(writer.into_inner()).map_err(|e| ConversionError::xml("output", e))
}

fn parse(xml: &str) -> Result<Vec<Node>> {
    let mut reader = Reader::from_str(xml);
    let mut roots = Vec::new();
    let mut open: Vec<(BytesStart<'static>, Vec<Node>)> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ConversionError::xml("output", e))?;
        let node = match event {
            Event::Start(e) => {
                open.push((e.into_owned(), Vec::new()));
                continue;
            }
            Event::End(_) => match open.pop() {
                Some((start, children)) => Node::Element { start, children },
                None => return Err(ConversionError::xml("output", "unexpected closing tag")),
            },
            Event::Empty(e) => Node::Element {
                start: e.into_owned(),
                children: Vec::new(),
            },
            Event::Decl(_) => continue,
            Event::Eof => break,
            other => Node::Leaf(other.into_owned()),
        };
        match open.last_mut() {
            Some((_, children)) => children.push(node),
            None => roots.push(node),
        }
    }

    if let Some((start, _)) = open.last() {
        return Err(ConversionError::xml(
            "output",
            format!(
                "element '{}' is never closed",
                String::from_utf8_lossy(start.name().as_ref())
            ),
        ));
    }
    Ok(roots)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node, depth: usize) -> Result<()> {
    let (start, children) = match node {
        Node::Leaf(event) => return write(writer, event.clone()),
        Node::Element { start, children } => (start, children),
    };

    let significant: Vec<&Node> = children.iter().filter(|c| !c.is_blank()).collect();
    if significant.is_empty() {
        return write(writer, Event::Empty(start.borrow()));
    }
    if children.iter().any(|c| c.is_text() && !c.is_blank()) {
        return write_verbatim(writer, node);
    }

    write(writer, Event::Start(start.borrow()))?;
    for child in significant {
        newline(writer, depth + 1);
        write_node(writer, child, depth + 1)?;
    }
    newline(writer, depth);
    write(writer, Event::End(start.to_end()))
}

fn write_verbatim(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Leaf(event) => write(writer, event.clone()),
        Node::Element { start, children } if children.is_empty() => {
            write(writer, Event::Empty(start.borrow()))
        }
        Node::Element { start, children } => {
            write(writer, Event::Start(start.borrow()))?;
            for child in children {
                write_verbatim(writer, child)?;
            }
            write(writer, Event::End(start.to_end()))
        }
    }
}

fn newline(writer: &mut Writer<Vec<u8>>, depth: usize) {
    let out = writer.get_mut();
    out.push(b'\n');
    for _ in 0..depth {
        out.extend_from_slice(INDENT);
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ConversionError::xml("output", e))
}

/// Write to a sibling temporary file, then rename over `path`, so a failed
/// run never leaves a partial document behind
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let failed = |source: std::io::Error| ConversionError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    std::fs::write(&tmp_path, content).map_err(failed)?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        failed(e)
    })
}
