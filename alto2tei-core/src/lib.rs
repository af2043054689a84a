// alto2tei core library
//
// Converts a directory or zip archive of ALTO v4 OCR files into a single
// TEI document: per-file structural transform, ordered regex rewrites,
// facsimile assembly from line geometry, then a second structural
// transform and a final rewrite pass.

pub mod alto;
pub mod config;
pub mod envelope;
pub mod error;
pub mod extractor;
pub mod facsimile;
pub mod iiif;
pub mod input;
pub mod namespace;
pub mod processor;
pub mod rules;
pub mod serializer;
pub mod transforms;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{ConversionConfig, RuleConfig};
pub use error::{ConversionError, Result};
pub use extractor::TextLineCollector;
pub use input::{InputEntry, InputSource};
pub use processor::{Alto2TeiProcessor, ConversionOutcome, StepProfiler, StepTiming};
pub use rules::{RewriteRule, RuleSet};
pub use transforms::{AltoToWork, StructuralTransform, TransformParams, WorkToTei};
pub use types::*;
