//! Merge options and configuration.

use serde::{Deserialize, Serialize};

/// Date format used when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-time format used when none is configured.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Options controlling how record values become document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// What to do with placeholders that have no value
    pub missing: MissingValuePolicy,

    /// Fields treated as addresses. `None` detects them by name: any field
    /// whose lowercase name contains `address`.
    pub address_fields: Option<Vec<String>>,

    /// Fields every record must supply with a non-empty value
    pub required_fields: Vec<String>,

    /// chrono format for date values
    pub date_format: String,

    /// chrono format for date-time values
    pub datetime_format: String,

    /// Render records on the rayon thread pool
    pub parallel: bool,

    /// Field whose value names separate output documents
    pub name_field: String,

    /// Name of the single composed output document
    pub composed_name: String,
}

impl MergeOptions {
    /// Create new merge options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the missing value policy.
    pub fn with_missing(mut self, policy: MissingValuePolicy) -> Self {
        self.missing = policy;
        self
    }

    /// Replace placeholders without a value by `text`.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.missing = MissingValuePolicy::Fallback(text.into());
        self
    }

    /// Mark a field as an address field.
    ///
    /// The first explicit address field turns off name-based detection.
    pub fn with_address_field(mut self, name: impl Into<String>) -> Self {
        self.address_fields
            .get_or_insert_with(Vec::new)
            .push(name.into());
        self
    }

    /// Require a field in every record.
    pub fn with_required_field(mut self, name: impl Into<String>) -> Self {
        self.required_fields.push(name.into());
        self
    }

    /// Set the date format.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Set the date-time format.
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Enable or disable parallel rendering.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Render records in parallel.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Set the field that names separate outputs.
    pub fn with_name_field(mut self, name: impl Into<String>) -> Self {
        self.name_field = name.into();
        self
    }

    /// Set the composed output name.
    pub fn with_composed_name(mut self, name: impl Into<String>) -> Self {
        self.composed_name = name.into();
        self
    }

    /// Check if a field holds an address.
    pub fn is_address_field(&self, name: &str) -> bool {
        match self.address_fields {
            Some(ref fields) => fields.iter().any(|f| f == name),
            None => name.to_lowercase().contains("address"),
        }
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            missing: MissingValuePolicy::Keep,
            address_fields: None,
            required_fields: Vec::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            parallel: false,
            name_field: "Name".to_string(),
            composed_name: "merged".to_string(),
        }
    }
}

/// Handling of placeholders whose field is missing, null or NaN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Leave the placeholder text in the document
    #[default]
    Keep,
    /// Remove the placeholder
    Empty,
    /// Replace the placeholder with fixed text
    Fallback(String),
}

/// How successful records are turned into output documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One output document per record
    #[default]
    Separate,
    /// All records in one document, separated by page breaks
    Composed,
}
