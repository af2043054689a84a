use serde::{Deserialize, Serialize};

/// Geometry of one ALTO text line, as found in the source file.
///
/// Every field is the attribute text verbatim; a missing attribute is an
/// empty string, never parsed or normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLineRecord {
    pub id: String,
    /// Image reference of the owning page (a path or an IIIF service URL)
    pub source_url: String,
    pub hpos: String,
    pub vpos: String,
    pub width: String,
    pub height: String,
    /// Whitespace separated x/y values
    pub polygon_points: String,
}

/// Result of reading one file's line metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Number of line records appended
    Extracted(usize),
    /// No source image identifier, nothing appended
    Skipped,
}

/// Captured intermediate outputs from each pipeline stage
/// Used for diagnostics and for testing stage boundaries
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStages {
    /// Input entries in processing order
    pub files: Vec<String>,
    /// Concatenated stage 1 output
    pub intermediate: String,
    pub after_pre_rules: String,
    /// Text line records before facsimile assembly
    pub text_lines: Vec<TextLineRecord>,
    pub facsimile: Option<String>,
    pub enveloped: String,
    /// Stage 2 output
    pub transformed: String,
    pub after_post_rules: String,
    /// Pretty-printed document as written
    pub output: String,
}
