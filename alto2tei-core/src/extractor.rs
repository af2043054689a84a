use crate::alto::{self, AltoDocument};
use crate::error::Result;
use crate::types::{ExtractOutcome, TextLineRecord};
use tracing::{debug, warn};

/// Accumulates line geometry across every file of a run, in file order
/// then line order. The facsimile assembler takes the records out exactly
/// once with [`TextLineCollector::take`].
#[derive(Debug, Default)]
pub struct TextLineCollector {
    records: Vec<TextLineRecord>,
}

impl TextLineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one file and append a record per text line
    pub fn extract(&mut self, file_name: &str, content: &[u8]) -> Result<ExtractOutcome> {
        let doc = alto::parse(file_name, content)?;
        Ok(self.extract_document(file_name, &doc))
    }

    /// Append a record per text line of an already parsed file. A file with
    /// no source image reference contributes nothing.
    pub fn extract_document(&mut self, file_name: &str, doc: &AltoDocument) -> ExtractOutcome {
        let Some(source_url) = doc.source_image.as_deref() else {
            warn!(
                "skipping {} text lines (no 'fileIdentifier' or 'fileName')",
                file_name
            );
            return ExtractOutcome::Skipped;
        };

        let before = self.records.len();
        self.records.extend(doc.lines().map(|line| TextLineRecord {
            id: line.geometry.id.clone(),
            source_url: source_url.to_string(),
            hpos: line.geometry.hpos.clone(),
            vpos: line.geometry.vpos.clone(),
            width: line.geometry.width.clone(),
            height: line.geometry.height.clone(),
            polygon_points: line.polygon_points.clone(),
        }));
        let added = self.records.len() - before;
        debug!("{}: {} text lines from {}", file_name, added, source_url);

        ExtractOutcome::Extracted(added)
    }

    pub fn records(&self) -> &[TextLineRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand the records over and leave the collector empty
    pub fn take(&mut self) -> Vec<TextLineRecord> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(image: &str, lines: &str) -> String {
        format!(
            r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#">
<Description><sourceImageInformation>{image}</sourceImageInformation></Description>
<Layout><Page><PrintSpace><TextBlock>{lines}</TextBlock></PrintSpace></Page></Layout></alto>"#
        )
    }

    #[test]
    fn records_follow_file_then_line_order() {
        let mut collector = TextLineCollector::new();
        let first = page(
            "<fileName>a.jpg</fileName>",
            r#"<TextLine ID="a1" HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"/><TextLine ID="a2"/>"#,
        );
        let second = page("<fileName>b.jpg</fileName>", r#"<TextLine ID="b1"/>"#);

        assert_eq!(
            collector.extract("a.xml", first.as_bytes()).unwrap(),
            ExtractOutcome::Extracted(2)
        );
        assert_eq!(
            collector.extract("b.xml", second.as_bytes()).unwrap(),
            ExtractOutcome::Extracted(1)
        );

        let ids: Vec<_> = collector.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
        assert_eq!(
            collector.records()[0],
            TextLineRecord {
                id: "a1".into(),
                source_url: "a.jpg".into(),
                hpos: "1".into(),
                vpos: "2".into(),
                width: "3".into(),
                height: "4".into(),
                polygon_points: String::new(),
            }
        );
        assert_eq!(collector.records()[2].source_url, "b.jpg");
    }

    #[test]
    fn file_without_image_reference_is_skipped() {
        let mut collector = TextLineCollector::new();
        let content = page("", r#"<TextLine ID="x"/>"#);

        let outcome = collector.extract("orphan.xml", content.as_bytes()).unwrap();
        assert_eq!(outcome, ExtractOutcome::Skipped);
        assert!(collector.is_empty());
    }

    #[test]
    fn take_empties_the_collector() {
        let mut collector = TextLineCollector::new();
        let content = page("<fileIdentifier>img</fileIdentifier>", r#"<TextLine ID="x"/>"#);
        collector.extract("p.xml", content.as_bytes()).unwrap();

        let records = collector.take();
        assert_eq!(records.len(), 1);
        assert!(collector.is_empty());
        assert!(collector.take().is_empty());
    }
}
