use crate::config::ConversionConfig;
use crate::envelope;
use crate::error::{ConversionError, Result};
use crate::extractor::TextLineCollector;
use crate::facsimile;
use crate::input::InputSource;
use crate::namespace;
use crate::rules::RuleSet;
use crate::serializer;
use crate::transforms::{AltoToWork, StructuralTransform, TransformParams, WorkToTei};
use crate::types::{ExtractOutcome, PipelineStages};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Accumulated wall time of one pipeline step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTiming {
    pub step: &'static str,
    /// Number of timed runs; stage 1 runs once per page
    pub calls: usize,
    pub elapsed: Duration,
}

/// Collects per-step timings when `--profile` is on, a no-op otherwise
#[derive(Debug, Default)]
pub struct StepProfiler {
    timings: Option<Vec<StepTiming>>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            timings: enabled.then(Vec::new),
        }
    }

    pub fn time_step<F, R>(&mut self, step: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let Some(timings) = self.timings.as_mut() else {
            return f();
        };

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        debug!(step, elapsed_ms = elapsed.as_millis() as u64, "step timed");

        match timings.iter_mut().find(|t| t.step == step) {
            Some(timing) => {
                timing.calls += 1;
                timing.elapsed += elapsed;
            }
            None => timings.push(StepTiming {
                step,
                calls: 1,
                elapsed,
            }),
        }
        result
    }

    /// Timings in first-run order, empty when disabled
    pub fn timings(&self) -> &[StepTiming] {
        self.timings.as_deref().unwrap_or_default()
    }

    pub fn log_summary(&self) {
        let timings = self.timings();
        if timings.is_empty() {
            return;
        }

        let total: Duration = timings.iter().map(|t| t.elapsed).sum();
        for timing in timings {
            let share = timing.elapsed.as_secs_f64() / total.as_secs_f64().max(f64::EPSILON);
            info!(
                step = timing.step,
                calls = timing.calls,
                elapsed_ms = timing.elapsed.as_millis() as u64,
                "{:.1}% of conversion time",
                share * 100.0
            );
        }
        info!(total_ms = total.as_millis() as u64, "conversion timed");
    }
}

/// What a file conversion produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Written {
        path: PathBuf,
        pages: usize,
        zones: usize,
    },
    /// The input held no ALTO file; nothing was written
    NoInput,
}

struct Converted {
    document: String,
    pages: usize,
    zones: usize,
}

pub struct Alto2TeiProcessor {
    config: ConversionConfig,
    pre_rules: RuleSet,
    post_rules: RuleSet,
    alto_to_work: Box<dyn StructuralTransform>,
    work_to_tei: Box<dyn StructuralTransform>,
    profiling: bool,
}

impl Alto2TeiProcessor {
    /// Processor with the built-in structural transforms
    pub fn new(config: ConversionConfig) -> Result<Self> {
        Self::new_with_transforms(config, Box::new(AltoToWork), Box::new(WorkToTei))
    }

    /// Create processor with injected structural transforms. Both rule
    /// tables are compiled here, so a bad rule fails before any input is read.
    pub fn new_with_transforms(
        config: ConversionConfig,
        alto_to_work: Box<dyn StructuralTransform>,
        work_to_tei: Box<dyn StructuralTransform>,
    ) -> Result<Self> {
        let pre_rules = RuleSet::compile("pre", &config.pre_rules)?;
        let post_rules = RuleSet::compile("post", &config.post_rules)?;
        Ok(Self {
            config,
            pre_rules,
            post_rules,
            alto_to_work,
            work_to_tei,
            profiling: false,
        })
    }

    /// Log per-step timings
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert and return the TEI document, `None` when there is no ALTO input
    pub fn convert(&self, input: impl AsRef<Path>) -> Result<Option<String>> {
        Ok(self.run(input.as_ref(), None)?.map(|c| c.document))
    }

    /// Convert, capturing every intermediate stage output
    pub fn convert_capture_stages(
        &self,
        input: impl AsRef<Path>,
    ) -> Result<Option<PipelineStages>> {
        let mut stages = PipelineStages::default();
        match self.run(input.as_ref(), Some(&mut stages))? {
            Some(converted) => {
                stages.output = converted.document;
                Ok(Some(stages))
            }
            None => Ok(None),
        }
    }

    /// Convert and write the document to `output`. The file is only
    /// created once every step has succeeded.
    pub fn convert_to_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<ConversionOutcome> {
        let output = output.as_ref();
        let Some(converted) = self.run(input.as_ref(), None)? else {
            return Ok(ConversionOutcome::NoInput);
        };

        serializer::write_atomic(output, &converted.document)?;
        info!(
            "Wrote {} ({} pages, {} zones)",
            output.display(),
            converted.pages,
            converted.zones
        );
        Ok(ConversionOutcome::Written {
            path: output.to_path_buf(),
            pages: converted.pages,
            zones: converted.zones,
        })
    }

    fn run(&self, input: &Path, mut stages: Option<&mut PipelineStages>) -> Result<Option<Converted>> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(self.profiling);

        let mut source = InputSource::open(input)?;
        let entries = source.entries(&self.config)?;
        if entries.is_empty() {
            info!("No ALTO files found in {}", source.path().display());
            return Ok(None);
        }
        info!(
            "Converting {} ALTO files from {}",
            entries.len(),
            source.path().display()
        );
        if let Some(stages) = stages.as_deref_mut() {
            stages.files = entries.iter().map(|e| e.name.clone()).collect();
        }

        // Step 1: each file -> intermediate page markup, collecting line geometry
        let mut collector = TextLineCollector::new();
        let intermediate = profiler.time_step("1. ALTO → intermediate", || {
            let mut intermediate = String::new();
            for entry in &entries {
                let raw = source.read(entry)?;
                let content = namespace::repair(&entry.name, &raw, &self.config.alto_namespace)?;

                if let ExtractOutcome::Extracted(lines) = collector.extract(&entry.name, &content)? {
                    debug!("{}: {} line records", entry.name, lines);
                }

                let params = TransformParams::for_page(&entry.name, self.config.include_facsimile);
                let page = self
                    .alto_to_work
                    .apply(&content, &params)
                    .map_err(|source| ConversionError::Transform {
                        stage: format!("{} ({})", self.alto_to_work.name(), entry.name),
                        source,
                    })?;
                intermediate.push_str(&page);
            }
            Ok::<_, ConversionError>(intermediate)
        })?;
        debug!("step 1: {} bytes of intermediate markup", intermediate.len());

        // Step 2: typographic and structural rules on the raw text
        let after_pre = profiler.time_step("2. Pre rules", || self.pre_rules.apply(&intermediate))?;
        debug!("step 2: {} pre rules applied", self.pre_rules.len());

        if let Some(stages) = stages.as_deref_mut() {
            stages.intermediate = intermediate;
            stages.after_pre_rules = after_pre.clone();
            stages.text_lines = collector.records().to_vec();
        }

        // Step 3: facsimile from the collected line geometry
        let zones = if self.config.include_facsimile {
            collector.len()
        } else {
            0
        };
        let facsimile = if self.config.include_facsimile {
            let records = collector.take();
            Some(profiler.time_step("3. Facsimile", || {
                facsimile::build(records, &self.config.iiif_marker)
            })?)
        } else {
            debug!("step 3: facsimile disabled");
            None
        };

        // Step 4: TEI envelope
        let enveloped = envelope::build(
            &source.name(),
            &self.config.language,
            facsimile.as_deref(),
            &after_pre,
        );
        debug!("step 4: enveloped as '{}'", source.name());

        // Step 5: intermediate markup -> TEI
        let transformed = profiler
            .time_step("5. Intermediate → TEI", || {
                self.work_to_tei
                    .apply(enveloped.as_bytes(), &TransformParams::new())
            })
            .map_err(|source| ConversionError::Transform {
                stage: self.work_to_tei.name().to_string(),
                source,
            })?;

        // Step 6: structural fixes on the TEI document
        let after_post = profiler.time_step("6. Post rules", || self.post_rules.apply(&transformed))?;
        debug!("step 6: {} post rules applied", self.post_rules.len());

        // Step 7: indentation
        let document = profiler.time_step("7. Serialize", || serializer::pretty_print(&after_post))?;

        if let Some(stages) = stages.as_deref_mut() {
            stages.facsimile = facsimile;
            stages.enveloped = enveloped;
            stages.transformed = transformed;
            stages.after_post_rules = after_post;
        }

        profiler.log_summary();
        info!(
            "Converted {} pages in {:.3}s",
            entries.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(Some(Converted {
            document,
            pages: entries.len(),
            zones,
        }))
    }
}
