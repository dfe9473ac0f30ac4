//! Package reading options.

/// Options for reading DOCX packages.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to read `docProps/core.xml` into document metadata
    pub read_metadata: bool,

    /// Upper bound for a single uncompressed part in MB (0 = unlimited)
    pub max_part_size_mb: u32,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip unreadable resource parts).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable metadata reading.
    pub fn with_metadata(mut self, read: bool) -> Self {
        self.read_metadata = read;
        self
    }

    /// Set the per-part size limit in MB.
    pub fn with_max_part_size(mut self, mb: u32) -> Self {
        self.max_part_size_mb = mb;
        self
    }

    pub(crate) fn max_part_bytes(&self) -> Option<u64> {
        (self.max_part_size_mb > 0).then(|| u64::from(self.max_part_size_mb) * 1024 * 1024)
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            read_metadata: true,
            max_part_size_mb: 256,
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Skip broken optional parts and continue
    Lenient,
}
