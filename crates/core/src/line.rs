//! Line classification for the section state machine.
//!
//! A raw input line is either a run-start marker, a blank section
//! boundary, or a data line interpreted by whatever section is active.
//! Classification is a pure predicate layer; it never mutates parser
//! state and it has no error conditions.

/// First field of a run-start marker line (`Run        =         3`).
pub const RUN_MARKER: &str = "Run";

/// What a raw line is, relative to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// First whitespace-delimited field equals the run marker literal.
    RunStart,
    /// Empty or whitespace-only; closes the active section.
    Blank,
    /// Anything else; meaning depends on the active section.
    Data,
}

/// One input line split into whitespace-delimited fields, carrying its
/// 1-based line number for error reporting.
#[derive(Debug)]
pub struct Line<'a> {
    pub number: u32,
    pub fields: Vec<&'a str>,
}

impl<'a> Line<'a> {
    pub fn new(number: u32, raw: &'a str) -> Self {
        Line {
            number,
            fields: raw.split_whitespace().collect(),
        }
    }

    pub fn kind(&self) -> LineKind {
        match self.fields.first() {
            None => LineKind::Blank,
            Some(first) if *first == RUN_MARKER => LineKind::RunStart,
            Some(_) => LineKind::Data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_line_classifies_as_run_start() {
        let line = Line::new(1, "Run        =         3");
        assert_eq!(line.kind(), LineKind::RunStart);
        assert_eq!(line.fields, vec!["Run", "=", "3"]);
    }

    #[test]
    fn empty_and_whitespace_lines_are_blank() {
        assert_eq!(Line::new(1, "").kind(), LineKind::Blank);
        assert_eq!(Line::new(2, "   \t  ").kind(), LineKind::Blank);
    }

    #[test]
    fn anything_else_is_data() {
        assert_eq!(Line::new(1, " Mean  9.442e-01").kind(), LineKind::Data);
        assert_eq!(Line::new(2, "Fitness distribution").kind(), LineKind::Data);
    }

    #[test]
    fn marker_must_be_the_first_field() {
        // "Run" appearing later in the line does not start a run.
        assert_eq!(Line::new(1, "Current Run = 2").kind(), LineKind::Data);
    }
}
