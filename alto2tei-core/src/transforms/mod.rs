// Structural transform abstraction
//
// The pipeline runs two schema-to-schema transforms around the rewrite
// rules: ALTO file -> intermediate page markup, then enveloped intermediate
// markup -> TEI. Both are injected, so the rule engine and orchestration can
// be driven with stub transforms. The crate ships native implementations:
// - alto_work.rs: one ALTO file to a `<page>` fragment
// - work_tei.rs: the enveloped document to TEI

pub mod alto_work;
pub mod work_tei;

pub use alto_work::AltoToWork;
pub use work_tei::WorkToTei;

use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Stage 1 parameter: identifier of the page, see [`page_id`]
pub const PAGE_ID: &str = "page_id";
/// Stage 1 parameter: `"1"` to link lines to facsimile zones, `"0"` not to
pub const FACSIMILE: &str = "facsimile";

/// Transform trait - converts one document into another markup
///
/// Implementations receive raw bytes (the input may declare its own
/// encoding) and named string parameters, and return the transformed
/// markup. Any error aborts the conversion run.
pub trait StructuralTransform {
    /// Get transform name for logging and error messages
    fn name(&self) -> &str;

    fn apply(&self, content: &[u8], params: &TransformParams) -> Result<String>;
}

/// Named string parameters, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformParams {
    entries: Vec<(String, String)>,
}

impl TransformParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing an earlier value of the same name
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parameters for the file -> intermediate transform
    pub fn for_page(file_name: &str, include_facsimile: bool) -> Self {
        Self::new()
            .with(PAGE_ID, page_id(file_name))
            .with(FACSIMILE, if include_facsimile { "1" } else { "0" })
    }
}

/// Deterministic, URL-safe page identifier derived from a file name
pub fn page_id(file_name: &str) -> String {
    URL_SAFE_NO_PAD.encode(file_name)
}
