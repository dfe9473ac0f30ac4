//! Batch orchestration: render every record, collect failures, compose
//! outputs and write them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, ErrorKind, Result};
use crate::model::Document;
use crate::record::Record;

use super::composer::{compose, warn_unresolved_references};
use super::options::{MergeOptions, OutputMode};
use super::policy::substitution_text;
use super::renderer::{render_record, RenderedDocument, Template};

/// Stem used for separate outputs whose record has no usable name.
pub const DEFAULT_OUTPUT_STEM: &str = "Document";

/// Progress of a batch run.
///
/// `Idle → Loading → LoadFailed`, or
/// `Idle → [Loading →] Rendering(i) … → AllRendered → Composing → Done | ComposeFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    /// Nothing started
    #[default]
    Idle,
    /// Reading the template
    Loading,
    /// The template could not be read
    LoadFailed,
    /// Rendering the record at this index
    Rendering(usize),
    /// Every record was rendered or failed
    AllRendered,
    /// Assembling output documents
    Composing,
    /// Output composition failed
    ComposeFailed,
    /// Finished with outputs
    Done,
}

impl BatchPhase {
    /// Check if the batch has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchPhase::LoadFailed | BatchPhase::ComposeFailed | BatchPhase::Done
        )
    }

    /// Check if the batch stopped on a fatal error.
    pub fn is_failed(&self) -> bool {
        matches!(self, BatchPhase::LoadFailed | BatchPhase::ComposeFailed)
    }
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPhase::Idle => write!(f, "idle"),
            BatchPhase::Loading => write!(f, "loading"),
            BatchPhase::LoadFailed => write!(f, "load failed"),
            BatchPhase::Rendering(i) => write!(f, "rendering record {}", i),
            BatchPhase::AllRendered => write!(f, "all rendered"),
            BatchPhase::Composing => write!(f, "composing"),
            BatchPhase::ComposeFailed => write!(f, "compose failed"),
            BatchPhase::Done => write!(f, "done"),
        }
    }
}

/// Phase bookkeeping with transition logging.
#[derive(Debug, Default)]
struct PhaseTracker {
    phase: BatchPhase,
}

impl PhaseTracker {
    fn advance(&mut self, next: BatchPhase) {
        log::debug!("Batch phase: {} -> {}", self.phase, next);
        self.phase = next;
    }
}

/// A record that could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// Position of the record in the input
    pub index: usize,
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable reason
    pub message: String,
}

/// One output document and the records it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    /// File stem for the output
    pub name: String,
    /// Indices of the records merged into this document
    pub records: Vec<usize>,
    /// The merged content
    pub document: Document,
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchResult {
    /// Output documents, in input order
    pub outputs: Vec<OutputDocument>,
    /// Indices of records rendered successfully, ascending
    pub succeeded: Vec<usize>,
    /// Per-record failures, ascending by index
    pub failed: Vec<RecordFailure>,
    /// Terminal phase
    pub phase: BatchPhase,
    /// The fatal error when the phase is `LoadFailed` or `ComposeFailed`
    pub error: Option<Error>,
}

impl BatchResult {
    fn fatal(phase: BatchPhase, error: Error, succeeded: Vec<usize>, failed: Vec<RecordFailure>) -> Self {
        Self {
            outputs: Vec::new(),
            succeeded,
            failed,
            phase,
            error: Some(error),
        }
    }

    /// Check if the batch finished and produced its outputs.
    pub fn is_complete(&self) -> bool {
        self.phase == BatchPhase::Done
    }

    /// Check if any record failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of records processed.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Turn a fatal batch error into `Err`.
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    /// Write every output into `dir`, creating it if needed.
    ///
    /// A failure to write one output does not stop the others; it is recorded
    /// in the returned report.
    pub fn save_all<P: AsRef<Path>>(&self, template: &Template, dir: P) -> Result<SaveReport> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let extension = template.package().format().output_format().extension();
        let mut report = SaveReport::default();

        for output in &self.outputs {
            let path = dir.join(format!("{}.{}", output.name, extension));
            match template.save_document(&output.document, &path) {
                Ok(()) => {
                    log::debug!("Wrote {}", path.display());
                    report.written.push(path);
                }
                Err(e) => {
                    log::warn!("Failed to write {}: {}", path.display(), e);
                    report.failed.push(SaveFailure {
                        name: output.name.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Wrote {} of {} outputs to {}",
            report.written.len(),
            self.outputs.len(),
            dir.display()
        );
        Ok(report)
    }
}

/// Outcome of [`BatchResult::save_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Paths written successfully
    pub written: Vec<PathBuf>,
    /// Outputs that could not be written
    pub failed: Vec<SaveFailure>,
}

impl SaveReport {
    /// Check if every output was written.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An output that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFailure {
    /// Output name
    pub name: String,
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable reason
    pub message: String,
}

/// Merge every record into a loaded template.
pub fn run(
    template: &Template,
    records: &[Record],
    mode: OutputMode,
    options: &MergeOptions,
) -> BatchResult {
    let mut tracker = PhaseTracker::default();
    run_tracked(template, records, mode, options, &mut tracker)
}

/// Load a template and merge every record into it.
///
/// A template that cannot be read ends the batch in
/// [`BatchPhase::LoadFailed`] before any record is rendered.
pub fn run_file<P: AsRef<Path>>(
    path: P,
    records: &[Record],
    mode: OutputMode,
    options: &MergeOptions,
) -> BatchResult {
    let mut tracker = PhaseTracker::default();
    tracker.advance(BatchPhase::Loading);

    match Template::open(path) {
        Ok(template) => run_tracked(&template, records, mode, options, &mut tracker),
        Err(e) => {
            log::error!("Template load failed: {}", e);
            tracker.advance(BatchPhase::LoadFailed);
            BatchResult::fatal(tracker.phase, e, Vec::new(), Vec::new())
        }
    }
}

fn run_tracked(
    template: &Template,
    records: &[Record],
    mode: OutputMode,
    options: &MergeOptions,
    tracker: &mut PhaseTracker,
) -> BatchResult {
    log::info!(
        "Merging {} records ({:?} output{})",
        records.len(),
        mode,
        if options.parallel { ", parallel" } else { "" }
    );

    let results = render_all(template, records, options, tracker);
    tracker.advance(BatchPhase::AllRendered);

    let mut rendered = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(doc) => rendered.push(doc),
            Err(e) => {
                log::warn!("Record {} failed: {}", index, e);
                failed.push(RecordFailure {
                    index,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }
    let succeeded: Vec<usize> = rendered.iter().map(|r| r.record_index).collect();

    tracker.advance(BatchPhase::Composing);
    let outputs = match mode {
        OutputMode::Separate => {
            // Every output shares the template's references.
            if let Some(first) = rendered.first() {
                warn_unresolved_references(&first.document);
            }
            Ok(rendered
                .into_iter()
                .map(|doc| {
                    let index = doc.record_index;
                    OutputDocument {
                        name: output_name(&records[index], index, options),
                        records: vec![index],
                        document: doc.document,
                    }
                })
                .collect::<Vec<_>>())
        }
        OutputMode::Composed => compose(rendered).map(|document| {
            vec![OutputDocument {
                name: options.composed_name.clone(),
                records: succeeded.clone(),
                document,
            }]
        }),
    };

    let outputs = match outputs {
        Ok(outputs) => outputs,
        Err(e) => {
            log::error!("Composition failed: {}", e);
            tracker.advance(BatchPhase::ComposeFailed);
            return BatchResult::fatal(tracker.phase, e, succeeded, failed);
        }
    };

    tracker.advance(BatchPhase::Done);
    log::info!(
        "Batch finished: {} succeeded, {} failed, {} outputs",
        succeeded.len(),
        failed.len(),
        outputs.len()
    );

    BatchResult {
        outputs,
        succeeded,
        failed,
        phase: tracker.phase,
        error: None,
    }
}

fn render_all(
    template: &Template,
    records: &[Record],
    options: &MergeOptions,
    tracker: &mut PhaseTracker,
) -> Vec<Result<RenderedDocument>> {
    if options.parallel {
        if !records.is_empty() {
            tracker.advance(BatchPhase::Rendering(0));
        }
        // Collecting an indexed parallel iterator keeps input order.
        return records
            .par_iter()
            .enumerate()
            .map(|(index, record)| {
                log::debug!("Rendering record {}", index);
                render_record(template, index, record, options)
            })
            .collect();
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            tracker.advance(BatchPhase::Rendering(index));
            render_record(template, index, record, options)
        })
        .collect()
}

/// File stem for a separate output: `{name}_{index}`.
fn output_name(record: &Record, index: usize, options: &MergeOptions) -> String {
    let stem = record
        .get(&options.name_field)
        .filter(|value| !value.is_absent())
        .and_then(|value| {
            substitution_text(&options.name_field, Some(value), options)
                .ok()
                .flatten()
        })
        .map(|text| sanitize_file_stem(&text))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_STEM.to_string());
    format!("{}_{}", stem, index)
}

/// Replace characters that are not allowed in file names.
fn sanitize_file_stem(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    replaced.trim().trim_matches('.').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Resource};
    use crate::record::FieldValue;
    use std::sync::Mutex;

    struct WarningLog {
        lines: Mutex<Vec<String>>,
    }

    impl log::Log for WarningLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                if let Ok(mut lines) = self.lines.lock() {
                    lines.push(record.args().to_string());
                }
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: WarningLog = WarningLog {
        lines: Mutex::new(Vec::new()),
    };

    fn warnings_about(needle: &str) -> usize {
        WARNINGS
            .lines
            .lock()
            .map(|lines| lines.iter().filter(|l| l.contains(needle)).count())
            .unwrap_or(0)
    }

    fn template() -> Template {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("Hello {{Name}}, your code is {{Code}}."));
        Template::from_document(doc)
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("Name", "Anna").with("Code", "A1"),
            Record::new().with("Name", "Bad\u{0}").with("Code", "B2"),
            Record::new().with("Name", "Juris").with("Code", "C3"),
        ]
    }

    #[test]
    fn test_composed_with_failure() {
        let result = run(&template(), &records(), OutputMode::Composed, &MergeOptions::default());

        assert!(result.is_complete());
        assert_eq!(result.succeeded, vec![0, 2]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].index, 1);
        assert_eq!(result.failed[0].kind, ErrorKind::Render);

        assert_eq!(result.outputs.len(), 1);
        let output = &result.outputs[0];
        assert_eq!(output.name, "merged");
        assert_eq!(output.records, vec![0, 2]);
        assert_eq!(output.document.page_break_count(), 1);
    }

    #[test]
    fn test_separate_outputs_named_by_record() {
        let mut input = records();
        input[1] = Record::new().with("Code", "B2");
        input.push(Record::new().with("Name", "a/b: c").with("Code", "D4"));

        let result = run(&template(), &input, OutputMode::Separate, &MergeOptions::default());
        let names: Vec<_> = result.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Anna_0", "Document_1", "Juris_2", "a_b_ c_3"]);
        assert!(result
            .outputs
            .iter()
            .all(|o| o.document.page_break_count() == 0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let many: Vec<Record> = (0..40)
            .map(|i| {
                Record::new()
                    .with("Name", format!("Person {i}"))
                    .with("Code", i64::from(i))
            })
            .collect();

        let sequential = run(&template(), &many, OutputMode::Composed, &MergeOptions::default());
        let parallel = run(
            &template(),
            &many,
            OutputMode::Composed,
            &MergeOptions::new().parallel(),
        );

        assert_eq!(sequential.succeeded, parallel.succeeded);
        assert_eq!(sequential.outputs, parallel.outputs);
    }

    #[test]
    fn test_all_failed_composed_is_fatal() {
        let input = vec![Record::new().with("Name", FieldValue::Float(f64::INFINITY))];
        let result = run(&template(), &input, OutputMode::Composed, &MergeOptions::default());

        assert_eq!(result.phase, BatchPhase::ComposeFailed);
        assert!(result.phase.is_failed());
        assert_eq!(result.failed.len(), 1);
        assert!(matches!(result.into_result(), Err(Error::Compose(_))));
    }

    #[test]
    fn test_load_failure() {
        let result = run_file(
            "/nonexistent/template.docx",
            &records(),
            OutputMode::Composed,
            &MergeOptions::default(),
        );
        assert_eq!(result.phase, BatchPhase::LoadFailed);
        assert!(result.failed.is_empty());
        assert!(matches!(result.error, Some(Error::TemplateLoad(_))));
    }

    #[test]
    fn test_save_all() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let template = template();
        let result = run(&template, &records(), OutputMode::Separate, &MergeOptions::default());

        let report = result.save_all(&template, &out).unwrap();
        assert!(report.is_success());
        assert_eq!(report.written.len(), 2);
        assert!(out.join("Anna_0.docx").exists());
        assert!(out.join("Juris_2.docx").exists());
    }

    #[test]
    fn test_separate_mode_checks_references_once() {
        let _ = log::set_logger(&WARNINGS);
        log::set_max_level(log::LevelFilter::Warn);

        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("Hello {{Name}}").styled("UnsetLetterhead"));
        doc.resources
            .insert(Resource::style("Normal", "<w:style w:styleId=\"Normal\"/>"));
        let template = Template::from_document(doc);

        let result = run(&template, &records(), OutputMode::Separate, &MergeOptions::default());
        assert_eq!(result.outputs.len(), 2);
        assert_eq!(warnings_about("UnsetLetterhead"), 1);
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("  ..Report.. "), "Report");
        assert_eq!(sanitize_file_stem("x\ty"), "x_y");
    }
}
