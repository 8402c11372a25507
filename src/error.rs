use thiserror::Error;

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Fatal problems found while checking inputs, before any plot is written.
///
/// Both variants carry every offending file so a single run reports them all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("column '{column}' is required for grouping but missing from: {}", .files.join(", "))]
    MissingColumn { column: String, files: Vec<String> },

    #[error("column '{column}' produces non-finite bin keys in: {}", .files.join(", "))]
    InvalidValue { column: String, files: Vec<String> },
}

// ---------------------------------------------------------------------------
// Chart rendering
// ---------------------------------------------------------------------------

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Failed to convert plot to PDF: {0}")]
    Pdf(String),

    #[error("Failed to write plot file: {0}")]
    Io(#[from] std::io::Error),
}
