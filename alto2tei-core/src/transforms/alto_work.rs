//! ALTO -> intermediate page markup
//!
//! Produces one `<page>` fragment per ALTO file, shaped for the pre rules:
//!
//! ```text
//! <page id="{page_id}" n="{number}" facs="#line1 #line2">
//! <p>
//! first line of a block
//! <small>a line set in smaller type</small>
//! </p>
//! </page>
//! ```
//!
//! One `<p>` per TextBlock, one text line per TextLine. Words are joined
//! with single spaces and a HYP renders as `-`. A line is wrapped in `<tt>`
//! when its font is fixed width, otherwise in `<small>` or `<big>` when its
//! size departs from the page's dominant size. Word styles become nested
//! `b`, `i`, `u`, `sc`, `sup`, `sub` tags, in that order from the outside.

use super::{StructuralTransform, TransformParams, FACSIMILE, PAGE_ID};
use crate::alto::{self, AltoDocument, LineItem, TextBlock, TextLine, TextStyle, Word};
use anyhow::{bail, Context, Result};
use quick_xml::escape::{escape, partial_escape};
use std::collections::HashMap;

/// Below this fraction of the dominant size a line is small type
const SMALL_RATIO: f32 = 0.85;
/// Above this multiple of the dominant size a line is large type
const BIG_RATIO: f32 = 1.2;

/// FONTSTYLE token and the tag it maps to, outermost first
const INLINE_TAGS: [(&str, &str); 6] = [
    ("bold", "b"),
    ("italics", "i"),
    ("underline", "u"),
    ("smallcaps", "sc"),
    ("superscript", "sup"),
    ("subscript", "sub"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct AltoToWork;

impl StructuralTransform for AltoToWork {
    fn name(&self) -> &str {
        "alto-to-work"
    }

    fn apply(&self, content: &[u8], params: &TransformParams) -> Result<String> {
        let page_id = params
            .get(PAGE_ID)
            .context("missing parameter 'page_id'")?;
        let link_zones = match params.get(FACSIMILE) {
            Some("1") => true,
            Some("0") | None => false,
            Some(other) => bail!("parameter 'facsimile' must be \"0\" or \"1\", got {other:?}"),
        };

        let doc = alto::parse(page_id, content)?;
        Ok(render_page(&doc, page_id, link_zones))
    }
}

fn render_page(doc: &AltoDocument, page_id: &str, link_zones: bool) -> String {
    let mut out = format!("<page id=\"{}\"", escape(page_id));
    if let Some(n) = &doc.page_number {
        out.push_str(&format!(" n=\"{}\"", escape(n)));
    }
    // Zones only exist for pages whose image is known
    if link_zones && doc.source_image.is_some() {
        let facs = doc
            .lines()
            .filter(|line| !line.geometry.id.is_empty())
            .map(|line| format!("#{}", line.geometry.id))
            .collect::<Vec<_>>()
            .join(" ");
        if !facs.is_empty() {
            out.push_str(&format!(" facs=\"{}\"", escape(&facs)));
        }
    }
    out.push_str(">\n");

    let body_size = dominant_size(doc);
    for block in &doc.blocks {
        let lines: Vec<String> = block
            .lines
            .iter()
            .filter_map(|line| render_line(doc, block, line, body_size))
            .collect();
        if lines.is_empty() {
            continue;
        }
        out.push_str("<p>\n");
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("</p>\n");
    }

    out.push_str("</page>\n");
    out
}

fn render_line(
    doc: &AltoDocument,
    block: &TextBlock,
    line: &TextLine,
    body_size: Option<f32>,
) -> Option<String> {
    let mut text = String::new();
    for item in &line.items {
        match item {
            LineItem::Word(word) if !word.content.is_empty() => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&render_word(doc, block, line, word));
            }
            LineItem::Hyphen => text.push('-'),
            // Adjacent words are separated anyway
            LineItem::Word(_) | LineItem::Space => {}
        }
    }
    if text.is_empty() {
        return None;
    }

    let wrapper = match line_style(doc, block, line) {
        Some(style) if style.fixed_width => Some("tt"),
        style => match (style.and_then(|s| s.size), body_size) {
            (Some(size), Some(body)) if size < body * SMALL_RATIO => Some("small"),
            (Some(size), Some(body)) if size > body * BIG_RATIO => Some("big"),
            _ => None,
        },
    };

    Some(match wrapper {
        Some(tag) => format!("<{tag}>{text}</{tag}>"),
        None => text,
    })
}

fn render_word(doc: &AltoDocument, block: &TextBlock, line: &TextLine, word: &Word) -> String {
    let inherited = doc.effective_style(&[&word.style_refs, &line.style_refs, &block.style_refs]);
    let has = |token: &str| {
        word.font_styles.iter().any(|s| s == token)
            || inherited.is_some_and(|style| style.font_styles.iter().any(|s| s == token))
    };
    let tags: Vec<&str> = INLINE_TAGS
        .iter()
        .filter(|(token, _)| has(token))
        .map(|(_, tag)| *tag)
        .collect();

    let mut out = String::new();
    for tag in &tags {
        out.push_str(&format!("<{tag}>"));
    }
    out.push_str(&partial_escape(&word.content));
    for tag in tags.iter().rev() {
        out.push_str(&format!("</{tag}>"));
    }
    out
}

/// Style of a line: its own, its block's, else its first word's
fn line_style<'a>(
    doc: &'a AltoDocument,
    block: &TextBlock,
    line: &TextLine,
) -> Option<&'a TextStyle> {
    let first_word = line
        .words()
        .next()
        .map(|word| word.style_refs.as_slice())
        .unwrap_or_default();
    doc.effective_style(&[&line.style_refs, &block.style_refs, first_word])
}

/// Most common line font size, to tenths of a point
fn dominant_size(doc: &AltoDocument) -> Option<f32> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for block in &doc.blocks {
        for line in &block.lines {
            if let Some(size) = line_style(doc, block, line).and_then(|s| s.size) {
                *counts.entry((size * 10.0).round() as i64).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(tenths, _)| tenths as f32 / 10.0)
}
