//! ALTO namespace repair
//!
//! Files produced against ALTO v2/v3 declare an older default namespace.
//! The converter expects v4, so such files get their default namespace
//! declarations rewritten before the first structural transform.

use crate::error::{ConversionError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use tracing::warn;

/// Default namespace declared on the root element, if any
pub fn root_namespace(source: &str, content: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return default_namespace(source, &e),
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(ConversionError::xml(source, e)),
        }
        buf.clear();
    }
}

/// Return the content unchanged when its root declares `expected` or no
/// default namespace at all, otherwise a copy where every default namespace
/// equal to the root's old one is replaced.
pub fn repair<'a>(source: &str, content: &'a [u8], expected: &str) -> Result<Cow<'a, [u8]>> {
    let old = match root_namespace(source, content)? {
        Some(old) if old != expected => old,
        _ => return Ok(Cow::Borrowed(content)),
    };
    warn!("{}: replace deprecated namespace {}", source, old);

    let mut reader = Reader::from_reader(content);
    let mut writer = Writer::new(Vec::with_capacity(content.len() + 64));
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ConversionError::xml(source, e))?;
        let result = match event {
            Event::Start(e) => {
                let start = rewrite_start(source, &e, &old, expected)?;
                writer.write_event(Event::Start(start))
            }
            Event::Empty(e) => {
                let start = rewrite_start(source, &e, &old, expected)?;
                writer.write_event(Event::Empty(start))
            }
            Event::Eof => break,
            other => writer.write_event(other),
        };
        result.map_err(|e| ConversionError::xml(source, e))?;
        buf.clear();
    }

    Ok(Cow::Owned(writer.into_inner()))
}

fn default_namespace(source: &str, e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConversionError::xml(source, err))?;
        if attr.key.as_ref() == b"xmlns" {
            let value = attr
                .unescape_value()
                .map_err(|err| ConversionError::xml(source, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn rewrite_start(
    source: &str,
    e: &BytesStart,
    old: &str,
    expected: &str,
) -> Result<BytesStart<'static>> {
    let mut start = e.to_owned();
    start.clear_attributes();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConversionError::xml(source, err))?;
        if attr.key.as_ref() == b"xmlns" {
            let value = attr
                .unescape_value()
                .map_err(|err| ConversionError::xml(source, err))?;
            if value == old {
                start.push_attribute(("xmlns", expected));
                continue;
            }
        }
        start.push_attribute(attr);
    }
    Ok(start)
}
