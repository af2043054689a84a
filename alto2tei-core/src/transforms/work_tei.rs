//! Intermediate page markup -> TEI
//!
//! Runs on the enveloped document. Everything outside `<body>` is copied
//! through. Inside it:
//! - `<page>` becomes a `<pb>` milestone (`xml:id="pg-{id}"`, `n`, `facs`)
//! - `<p>`, `<fw>` and `<head>` blocks get their whitespace collapsed;
//!   blocks left without text are dropped
//! - a `<p>` opening on a `<small>` numbered label becomes a `<note>`
//! - `<small>`/`<big>` are unwrapped, typographic tags become `<hi rend>`
//! - each first-level heading opens a division
//!
//! Divisions cannot be written as elements without unbalancing the stream
//! (they span pages), so they are marked with `<?div?>` and `<?div /?>`
//! processing instructions, turned into tags by the post rules.

use super::{StructuralTransform, TransformParams};
use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\n]+").unwrap());
static NOTE_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+\.\s").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkToTei;

impl StructuralTransform for WorkToTei {
    fn name(&self) -> &str {
        "work-to-tei"
    }

    fn apply(&self, content: &[u8], _params: &TransformParams) -> Result<String> {
        let mut reader = Reader::from_reader(content);
        let mut body = BodyWriter::default();
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .with_context(|| format!("malformed markup at byte {}", reader.buffer_position()))?;
            if matches!(event, Event::Eof) {
                break;
            }
            body.handle(event)?;
            buf.clear();
        }

        body.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Paragraph,
    FormeWork,
    Head,
}

impl BlockKind {
    fn of(name: &[u8]) -> Option<Self> {
        match name {
            b"p" => Some(Self::Paragraph),
            b"fw" => Some(Self::FormeWork),
            b"head" => Some(Self::Head),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Piece {
    Markup(Event<'static>),
    /// Escaped text
    Text(String),
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    start: BytesStart<'static>,
    depth: usize,
    pieces: Vec<Piece>,
}

/// What an inline element of the intermediate markup turns into
enum Inline {
    Unwrap,
    Hi(&'static str),
    Keep,
}

fn inline(name: &[u8]) -> Inline {
    match name {
        b"small" | b"big" => Inline::Unwrap,
        b"tt" => Inline::Hi("monospace"),
        b"b" => Inline::Hi("bold"),
        b"i" => Inline::Hi("italic"),
        b"u" => Inline::Hi("underline"),
        b"sc" => Inline::Hi("small-caps"),
        b"sup" => Inline::Hi("sup"),
        b"sub" => Inline::Hi("sub"),
        _ => Inline::Keep,
    }
}

fn hi(rend: &str) -> BytesStart<'static> {
    let mut start = BytesStart::new("hi");
    start.push_attribute(("rend", rend));
    start
}

struct BodyWriter {
    writer: Writer<Vec<u8>>,
    in_body: bool,
    div_open: bool,
    page_index: usize,
    notes_on_page: usize,
    block: Option<Block>,
}

impl Default for BodyWriter {
    fn default() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            in_body: false,
            div_open: false,
            page_index: 0,
            notes_on_page: 0,
            block: None,
        }
    }
}

impl BodyWriter {
    fn handle(&mut self, event: Event) -> Result<()> {
        if !self.in_body {
            if let Event::Start(e) = &event {
                self.in_body = e.name().as_ref() == b"body";
            }
            return self.write(event);
        }

        if let Some(block) = self.block.as_mut() {
            match event {
                Event::End(_) if block.depth == 0 => {
                    if let Some(block) = self.block.take() {
                        self.flush_block(block)?;
                    }
                }
                Event::Text(t) => {
                    let text = std::str::from_utf8(&t).context("text is not UTF-8")?;
                    block.pieces.push(Piece::Text(text.to_string()));
                }
                event => {
                    match &event {
                        Event::Start(_) => block.depth += 1,
                        Event::End(_) => block.depth -= 1,
                        _ => {}
                    }
                    block.pieces.push(Piece::Markup(event.into_owned()));
                }
            }
            return Ok(());
        }

        match event {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"page" => {
                self.page_break(&e)
            }
            Event::End(e) if e.name().as_ref() == b"page" => Ok(()),
            Event::Start(e) => match BlockKind::of(e.name().as_ref()) {
                Some(kind) => {
                    self.block = Some(Block {
                        kind,
                        start: e.into_owned(),
                        depth: 0,
                        pieces: Vec::new(),
                    });
                    Ok(())
                }
                None => self.write(Event::Start(e)),
            },
            Event::End(e) if e.name().as_ref() == b"body" => {
                self.close_div()?;
                self.in_body = false;
                self.write(Event::End(e))
            }
            Event::Text(t) => {
                let text = std::str::from_utf8(&t).context("text is not UTF-8")?;
                if text.trim().is_empty() {
                    return Ok(());
                }
                let text = WHITESPACE.replace_all(text, " ");
                self.write(Event::Text(BytesText::from_escaped(text.as_ref())))
            }
            event => self.write(event),
        }
    }

    fn page_break(&mut self, page: &BytesStart) -> Result<()> {
        self.page_index += 1;
        self.notes_on_page = 0;

        let mut pb = BytesStart::new("pb");
        for attr in page.attributes() {
            let attr = attr.context("malformed page attribute")?;
            if attr.key.as_ref() == b"id" {
                let mut id = b"pg-".to_vec();
                id.extend_from_slice(&attr.value);
                pb.push_attribute((b"xml:id".as_slice(), id.as_slice()));
            } else {
                pb.push_attribute(attr);
            }
        }
        self.write(Event::Empty(pb))?;
        self.newline()
    }

    fn flush_block(&mut self, mut block: Block) -> Result<()> {
        normalize(&mut block.pieces);
        if !block.pieces.iter().any(|p| matches!(p, Piece::Text(_))) {
            return Ok(());
        }

        let start = match block.kind {
            BlockKind::Paragraph if is_note(&block.pieces) => {
                self.notes_on_page += 1;
                let mut note = BytesStart::new("note");
                let id = format!("n{}-{}", self.page_index, self.notes_on_page);
                note.push_attribute(("xml:id", id.as_str()));
                note
            }
            BlockKind::FormeWork => {
                let mut fw = BytesStart::new("fw");
                fw.push_attribute(("type", "pageNum"));
                for attr in block.start.attributes() {
                    let attr = attr.context("malformed fw attribute")?;
                    if attr.key.as_ref() != b"type" {
                        fw.push_attribute(attr);
                    }
                }
                fw
            }
            BlockKind::Head if is_top_level(&block.start) => {
                self.close_div()?;
                self.write(Event::PI(BytesText::from_escaped("div")))?;
                self.div_open = true;
                block.start
            }
            _ => block.start,
        };

        let end = start.to_end().into_owned();
        self.write(Event::Start(start))?;
        for piece in block.pieces {
            self.write_piece(piece)?;
        }
        self.write(Event::End(end))?;
        self.newline()
    }

    fn write_piece(&mut self, piece: Piece) -> Result<()> {
        let event = match piece {
            Piece::Text(text) => return self.write(Event::Text(BytesText::from_escaped(text))),
            Piece::Markup(event) => event,
        };
        match event {
            Event::Start(e) => match inline(e.name().as_ref()) {
                Inline::Unwrap => Ok(()),
                Inline::Hi(rend) => self.write(Event::Start(hi(rend))),
                Inline::Keep => self.write(Event::Start(e)),
            },
            Event::Empty(e) => match inline(e.name().as_ref()) {
                Inline::Unwrap => Ok(()),
                Inline::Hi(rend) => self.write(Event::Empty(hi(rend))),
                Inline::Keep => self.write(Event::Empty(e)),
            },
            Event::End(e) => match inline(e.name().as_ref()) {
                Inline::Unwrap => Ok(()),
                Inline::Hi(_) => self.write(Event::End(BytesEnd::new("hi"))),
                Inline::Keep => self.write(Event::End(e)),
            },
            event => self.write(event),
        }
    }

    fn close_div(&mut self) -> Result<()> {
        if self.div_open {
            self.div_open = false;
            self.write(Event::PI(BytesText::from_escaped("div /")))?;
        }
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        self.write(Event::Text(BytesText::from_escaped("\n")))
    }

    fn write(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .context("failed to write TEI markup")
    }

    fn finish(self) -> Result<String> {
        if self.block.is_some() {
            bail!("document ends inside an unclosed block");
        }
        String::from_utf8(self.writer.into_inner()).context("output is not UTF-8")
    }
}

fn is_top_level(head: &BytesStart) -> bool {
    head.attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"n" && attr.value.as_ref() == b"1")
}

/// Collapse whitespace runs, trim the block's outer text edges (looking
/// through inline tags), then drop emptied text
fn normalize(pieces: &mut Vec<Piece>) {
    for piece in pieces.iter_mut() {
        if let Piece::Text(text) = piece {
            *text = WHITESPACE.replace_all(text, " ").into_owned();
        }
    }

    for piece in pieces.iter_mut() {
        match piece {
            Piece::Text(text) => {
                *text = text.trim_start_matches(' ').to_string();
                if !text.is_empty() {
                    break;
                }
            }
            Piece::Markup(Event::Start(_) | Event::End(_)) => {}
            Piece::Markup(_) => break,
        }
    }
    for piece in pieces.iter_mut().rev() {
        match piece {
            Piece::Text(text) => {
                text.truncate(text.trim_end_matches(' ').len());
                if !text.is_empty() {
                    break;
                }
            }
            Piece::Markup(Event::Start(_) | Event::End(_)) => {}
            Piece::Markup(_) => break,
        }
    }

    pieces.retain(|p| !matches!(p, Piece::Text(text) if text.is_empty()));
}

/// A paragraph opening on small type with a `N. ` label
fn is_note(pieces: &[Piece]) -> bool {
    let opens_small = matches!(
        pieces.first(),
        Some(Piece::Markup(Event::Start(e))) if e.name().as_ref() == b"small"
    );
    if !opens_small {
        return false;
    }
    let text: String = pieces
        .iter()
        .filter_map(|p| match p {
            Piece::Text(text) => Some(text.as_str()),
            Piece::Markup(_) => None,
        })
        .collect();
    NOTE_LABEL.is_match(&text)
}
