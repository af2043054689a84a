//! IIIF Image API region rewriting
//!
//! An Image API URL ends in `{region}/{size}/{rotation}/{quality}.{format}`.
//! Pointing a zone at one text line means replacing `{region}` with the
//! line's pixel box; everything else in the URL is kept as is.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL has no hierarchical path")]
    NoPath,

    #[error("path has {0} segments, an IIIF image URL needs at least 4")]
    TooFewSegments(usize),
}

/// Replace the region segment of an IIIF image URL with `hpos,vpos,width,height`.
///
/// Values are used verbatim, empty ones included. The URL is only parsed to
/// validate it; the result is the original string with the region spliced
/// in, so nothing else in it is normalised.
pub fn rewrite(
    url: &str,
    hpos: &str,
    vpos: &str,
    width: &str,
    height: &str,
) -> Result<String, RegionError> {
    let url = url.trim();
    if Url::parse(url)?.cannot_be_a_base() {
        return Err(RegionError::NoPath);
    }

    let (start, end) = path_span(url);
    let mut segments: Vec<&str> = url[start..end].split('/').skip(1).collect();
    if segments.len() < 4 {
        return Err(RegionError::TooFewSegments(segments.len()));
    }

    let region = format!("{hpos},{vpos},{width},{height}");
    let index = segments.len() - 4;
    segments[index] = &region;

    Ok(format!(
        "{}/{}{}",
        &url[..start],
        segments.join("/"),
        &url[end..]
    ))
}

/// Byte range of the path in a hierarchical URL string
fn path_span(url: &str) -> (usize, usize) {
    let after_scheme = url.find(':').map_or(0, |colon| colon + 1);
    let start = match url[after_scheme..].strip_prefix("//") {
        Some(rest) => after_scheme + 2 + rest.find(['/', '?', '#']).unwrap_or(rest.len()),
        None => after_scheme,
    };
    let end = url[start..]
        .find(['?', '#'])
        .map_or(url.len(), |offset| start + offset);
    (start, end)
}

/// Whether `url` should be treated as an IIIF service URL
pub fn is_iiif(url: &str, marker: &str) -> bool {
    !marker.is_empty() && url.contains(marker)
}
