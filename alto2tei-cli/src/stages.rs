use alto2tei_core::PipelineStages;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write every captured stage to `output_dir`, plus a `summary.json` quick
/// reference. Returns the written paths in stage order.
pub fn save_stages(stages: &PipelineStages, output_dir: &Path, input: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;

    let mut written = Vec::new();
    let mut save = |name: &str, content: &str| -> Result<()> {
        let path = output_dir.join(name);
        fs::write(&path, content).with_context(|| format!("cannot write {}", path.display()))?;
        info!("  saved {}", path.display());
        written.push(path);
        Ok(())
    };

    save("stage0_files.json", &serde_json::to_string_pretty(&stages.files)?)?;
    save("stage1_intermediate.xml", &stages.intermediate)?;
    save("stage2_after_pre_rules.xml", &stages.after_pre_rules)?;
    save(
        "stage3_text_lines.json",
        &serde_json::to_string_pretty(&stages.text_lines)?,
    )?;
    if let Some(facsimile) = &stages.facsimile {
        save("stage3_facsimile.xml", facsimile)?;
    }
    save("stage4_enveloped.xml", &stages.enveloped)?;
    save("stage5_transformed.xml", &stages.transformed)?;
    save("stage6_after_post_rules.xml", &stages.after_post_rules)?;
    save("stage7_output.xml", &stages.output)?;

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input": input.display().to_string(),
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "files": stages.files.len(),
            "intermediate_bytes": stages.intermediate.len(),
            "after_pre_rules_bytes": stages.after_pre_rules.len(),
            "text_lines": stages.text_lines.len(),
            "facsimile_bytes": stages.facsimile.as_ref().map_or(0, String::len),
            "transformed_bytes": stages.transformed.len(),
            "output_bytes": stages.output.len(),
        }
    });
    save("summary.json", &serde_json::to_string_pretty(&summary)?)?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alto2tei_core::TextLineRecord;

    fn stages(facsimile: Option<&str>) -> PipelineStages {
        PipelineStages {
            files: vec!["p1.xml".into(), "p2.xml".into()],
            intermediate: "<page id=\"a\">\n</page>\n".into(),
            text_lines: vec![TextLineRecord {
                id: "l1".into(),
                ..TextLineRecord::default()
            }],
            facsimile: facsimile.map(str::to_string),
            output: "<TEI/>\n".into(),
            ..PipelineStages::default()
        }
    }

    #[test]
    fn writes_every_stage_and_a_summary() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stages");
        let written = save_stages(&stages(Some("<facsimile/>")), &out, Path::new("book")).unwrap();

        assert_eq!(written.len(), 10);
        assert_eq!(
            fs::read_to_string(out.join("stage7_output.xml")).unwrap(),
            "<TEI/>\n"
        );

        let lines: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("stage3_text_lines.json")).unwrap())
                .unwrap();
        assert_eq!(lines[0]["id"], "l1");

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["input"], "book");
        assert_eq!(summary["stage_counts"]["files"], 2);
        assert_eq!(summary["stage_counts"]["facsimile_bytes"], 12);
    }

    #[test]
    fn facsimile_file_is_skipped_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let written = save_stages(&stages(None), dir.path(), Path::new("book")).unwrap();
        assert_eq!(written.len(), 9);
        assert!(!dir.path().join("stage3_facsimile.xml").exists());
    }
}
