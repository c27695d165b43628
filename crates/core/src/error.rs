use crate::parser::Section;

/// All errors that can be surfaced while extracting runs from a log.
///
/// Structural variants carry the 1-based input line number and, where it
/// matters, the section the parser was in. Extraction is fail-fast: any
/// of these aborts the whole file with no partial output.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Underlying read or write failure on the input/output streams.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Parameter line without the full `key = value` triple.
    #[error("line {line}: parameter line has {got} fields, expected 3")]
    ParamFields { line: u32, got: usize },

    /// Parameter block closed without a `loci` entry, so per-locus
    /// collections cannot be sized.
    #[error("line {line}: parameter block has no loci entry")]
    MissingLoci { line: u32 },

    /// `loci` present but not a positive integer.
    #[error("line {line}: loci value '{value}' is not a positive integer")]
    InvalidLoci { line: u32, value: String },

    /// `stochWt` present but not numeric, so the stochastic sections
    /// cannot be gated.
    #[error("line {line}: stochWt value '{value}' is not numeric")]
    InvalidStochWeight { line: u32, value: String },

    /// Percentile row arrived before the section's Mean and SD were both
    /// seen.
    #[error("line {line}: percentile row in {section} before {missing} was set")]
    PercentileBeforeStats {
        line: u32,
        section: Section,
        missing: &'static str,
    },

    /// Data row with fewer fields than the section needs.
    #[error("line {line}: {section} row has {got} fields, expected {expected}")]
    ShortRow {
        line: u32,
        section: Section,
        expected: usize,
        got: usize,
    },

    /// Percentile threshold that does not parse as a float.
    #[error("line {line}: {section} threshold '{value}' is not numeric")]
    Threshold {
        line: u32,
        section: Section,
        value: String,
    },

    /// Distribution closed without one of its summary statistics.
    #[error("line {line}: {section} closed without {stat}")]
    MissingStat {
        line: u32,
        section: Section,
        stat: &'static str,
    },

    /// Distribution closed with an empty percentile table.
    #[error("line {line}: {section} closed with no percentile rows")]
    NoPercentiles { line: u32, section: Section },

    /// Run block cut short: a new run marker or end of input arrived
    /// while a section was still open.
    #[error("line {line}: run block truncated in {section}")]
    Truncated { line: u32, section: Section },

    /// Input ended without a single run marker.
    #[error("no runs found in input")]
    NoRuns,
}
