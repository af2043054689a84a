use crate::error::{ConversionError, Result};
use crate::rules::{post, pre};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ALTO_V4_NAMESPACE: &str = "http://www.loc.gov/standards/alto/ns-v4#";

/// Conversion settings. Every field has a default, so a YAML file only
/// needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Namespace the stage 1 transform expects; older ALTO files are rewritten to it
    pub alto_namespace: String,
    /// File extensions (without the dot) treated as ALTO input, case sensitive
    pub file_suffixes: Vec<String>,
    /// Value of `xml:lang` on the TEI root
    pub language: String,
    /// Substring marking an image URL as an IIIF Image API endpoint
    pub iiif_marker: String,
    /// Emit the `<facsimile>` block and `facs` links
    pub include_facsimile: bool,
    /// Rules applied to the concatenated intermediate markup
    pub pre_rules: Vec<RuleConfig>,
    /// Rules applied to the TEI document after the second transform
    pub post_rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    /// Re-apply until the content stops changing
    #[serde(default)]
    pub repeat: bool,
    /// Substitute inside text segments only, leaving markup alone
    #[serde(default)]
    pub text_only: bool,
}

impl RuleConfig {
    pub fn new(name: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            repeat: false,
            text_only: false,
        }
    }

    pub fn repeated(name: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            repeat: true,
            ..Self::new(name, pattern, replacement)
        }
    }

    pub fn in_text(name: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            text_only: true,
            ..Self::new(name, pattern, replacement)
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            alto_namespace: ALTO_V4_NAMESPACE.to_string(),
            file_suffixes: vec!["xml".to_string(), "XML".to_string()],
            language: "fr".to_string(),
            iiif_marker: "iiif".to_string(),
            include_facsimile: true,
            pre_rules: pre::default_rules(),
            post_rules: post::default_rules(),
        }
    }
}

impl ConversionConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConversionError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConversionError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Load config from a file when a path is given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn accepts_file_name(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.file_suffixes.iter().any(|suffix| suffix == ext)
            }
            _ => false,
        }
    }
}
