//! Mail merge engine.
//!
//! The engine is split into small stages:
//!
//! - [`resolver`]: finds placeholders in a paragraph's runs and substitutes
//!   them without changing run boundaries or styles
//! - [`policy`]: turns a record's field value into substitution text
//! - [`renderer`]: loads templates and renders one record into a deep copy
//! - [`composer`]: joins rendered documents with page breaks and merges
//!   their style and numbering definitions
//! - [`batch`]: drives all of the above over a list of records
//!
//! # Example
//!
//! ```no_run
//! use docmerge::{MailMerge, Record, Template};
//!
//! fn main() -> docmerge::Result<()> {
//!     let template = Template::open("invitation.docx")?;
//!     let records = vec![
//!         Record::new().with("Name", "Anna").with("Code", "A1"),
//!         Record::new().with("Name", "Juris").with("Code", "B2"),
//!     ];
//!
//!     let result = MailMerge::new().composed().run(&template, &records);
//!     result.save_all(&template, "out")?;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod composer;
pub mod options;
pub mod policy;
pub mod renderer;
pub mod resolver;

pub use batch::{
    run, run_file, BatchPhase, BatchResult, OutputDocument, RecordFailure, SaveFailure,
    SaveReport,
};
pub use composer::{compose, compose_documents};
pub use options::{MergeOptions, MissingValuePolicy, OutputMode};
pub use policy::substitution_text;
pub use renderer::{render, render_with, RenderedDocument, Template};
pub use resolver::{resolve, Placeholder, PlaceholderScanner, Substitutions};

use std::path::Path;

use crate::record::Record;

/// Builder for a merge run.
#[derive(Debug, Clone, Default)]
pub struct MailMerge {
    options: MergeOptions,
    mode: OutputMode,
}

impl MailMerge {
    /// Create a merge with default options and separate outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options.
    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the output mode.
    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Produce one document containing every record.
    pub fn composed(mut self) -> Self {
        self.mode = OutputMode::Composed;
        self
    }

    /// Produce one document per record.
    pub fn separate(mut self) -> Self {
        self.mode = OutputMode::Separate;
        self
    }

    /// Set the missing value policy.
    pub fn missing(mut self, policy: MissingValuePolicy) -> Self {
        self.options.missing = policy;
        self
    }

    /// Replace placeholders without a value by `text`.
    pub fn fallback(mut self, text: impl Into<String>) -> Self {
        self.options = self.options.with_fallback(text);
        self
    }

    /// Mark a field as an address field.
    pub fn address_field(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.with_address_field(name);
        self
    }

    /// Require a field in every record.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.with_required_field(name);
        self
    }

    /// Set the field naming separate outputs.
    pub fn name_field(mut self, name: impl Into<String>) -> Self {
        self.options.name_field = name.into();
        self
    }

    /// Set the composed output name.
    pub fn composed_name(mut self, name: impl Into<String>) -> Self {
        self.options.composed_name = name.into();
        self
    }

    /// Enable or disable parallel rendering.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    /// Current options.
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Current output mode.
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Merge records into a loaded template.
    pub fn run(&self, template: &Template, records: &[Record]) -> BatchResult {
        batch::run(template, records, self.mode, &self.options)
    }

    /// Load a template file and merge records into it.
    pub fn run_file<P: AsRef<Path>>(&self, path: P, records: &[Record]) -> BatchResult {
        batch::run_file(path, records, self.mode, &self.options)
    }
}
