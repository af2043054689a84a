use crate::error::{ConversionError, Result};
use crate::iiif;
use crate::types::TextLineRecord;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::{debug, warn};

/// Build the `<facsimile>` block: one surface and zone per line record, in
/// record order. Takes the records by value; nothing of them survives the call.
pub fn build(records: Vec<TextLineRecord>, iiif_marker: &str) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    let zones = records.len();

    write(&mut writer, Event::Start(BytesStart::new("facsimile")))?;
    for record in records {
        write_surface(&mut writer, record, iiif_marker)?;
    }
    write(&mut writer, Event::End(BytesEnd::new("facsimile")))?;

    debug!("facsimile: {} zones", zones);
    String::from_utf8(writer.into_inner()).map_err(|e| ConversionError::xml("facsimile", e))
}

fn write_surface(
    writer: &mut Writer<Vec<u8>>,
    record: TextLineRecord,
    iiif_marker: &str,
) -> Result<()> {
    let url = image_url(&record, iiif_marker);

    write(writer, Event::Start(BytesStart::new("surface")))?;

    let mut graphic = BytesStart::new("graphic");
    graphic.push_attribute(("url", url.as_str()));
    write(writer, Event::Empty(graphic))?;

    let mut zone = BytesStart::new("zone");
    zone.push_attribute(("xml:id", record.id.as_str()));
    for (name, value) in [
        ("ulx", &record.hpos),
        ("uly", &record.vpos),
        ("lrx", &record.width),
        ("lry", &record.height),
    ] {
        if !value.is_empty() {
            zone.push_attribute((name, value.as_str()));
        }
    }
    let points = pair_points(&record.polygon_points);
    if !points.is_empty() {
        zone.push_attribute(("points", points.as_str()));
    }
    write(writer, Event::Empty(zone))?;

    write(writer, Event::End(BytesEnd::new("surface")))
}

/// The record's image URL, narrowed to the line's region for IIIF services
fn image_url(record: &TextLineRecord, iiif_marker: &str) -> String {
    if !iiif::is_iiif(&record.source_url, iiif_marker) {
        return record.source_url.clone();
    }
    match iiif::rewrite(
        &record.source_url,
        &record.hpos,
        &record.vpos,
        &record.width,
        &record.height,
    ) {
        Ok(url) => url,
        Err(e) => {
            warn!(
                "zone '{}': keeping image URL {} ({})",
                record.id, record.source_url, e
            );
            record.source_url.clone()
        }
    }
}

/// Pair a flat coordinate list into `x,y` points, dropping an unpaired tail.
/// Commas are accepted as separators too, so `x,y x,y` input is kept as is.
pub fn pair_points(points: &str) -> String {
    let values: Vec<&str> = points
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|v| !v.is_empty())
        .collect();
    values
        .chunks_exact(2)
        .map(|pair| format!("{},{}", pair[0], pair[1]))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ConversionError::xml("facsimile", e))
}
