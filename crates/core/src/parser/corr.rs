//! Correlation-matrix section parsing.
//!
//! A matrix section carries a heading, a column-header row, and then
//! one labelled row per locus. Rows are told apart from headers by
//! their second field containing a decimal point; the row label is
//! dropped and the remaining `loci` fields are kept verbatim.

use crate::error::ExtractError;
use crate::line::Line;
use crate::model::{CorrelationMatrix, Numeric};
use crate::parser::Section;

use super::distn::Step;

#[derive(Debug, Default)]
pub struct CorrSection {
    rows: Vec<Vec<Numeric>>,
    loci: usize,
}

impl CorrSection {
    pub fn reset(&mut self, loci: usize) {
        self.rows.clear();
        self.loci = loci;
    }

    /// Feed one line. A blank closes the section once at least one row
    /// has been collected; earlier blanks are part of the heading.
    pub fn consume(&mut self, line: &Line, section: Section) -> Result<Step, ExtractError> {
        let fields = &line.fields;
        if fields.is_empty() {
            return Ok(if self.rows.is_empty() {
                Step::Open
            } else {
                Step::Closed
            });
        }
        if !fields.get(1).is_some_and(|f| f.contains('.')) {
            // Heading or column-header row.
            return Ok(Step::Open);
        }
        if fields.len() < self.loci + 1 {
            return Err(ExtractError::ShortRow {
                line: line.number,
                section,
                expected: self.loci + 1,
                got: fields.len(),
            });
        }
        self.rows
            .push(fields[1..=self.loci].iter().map(|&f| Numeric::from(f)).collect());
        Ok(Step::Open)
    }

    /// True once at least one matrix row has been collected; used to
    /// decide whether end of input may stand in for the closing blank.
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn seal(&mut self) -> CorrelationMatrix {
        CorrelationMatrix {
            rows: std::mem::take(&mut self.rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(s: &mut CorrSection, number: u32, raw: &str) -> Result<Step, ExtractError> {
        s.consume(&Line::new(number, raw), Section::GenotypeCorr)
    }

    #[test]
    fn collects_rows_and_drops_labels() {
        let mut s = CorrSection::default();
        s.reset(2);
        assert_eq!(feed(&mut s, 1, "Genotypic correlations").unwrap(), Step::Open);
        assert_eq!(feed(&mut s, 2, "").unwrap(), Step::Open);
        assert_eq!(feed(&mut s, 3, "      g0     g1").unwrap(), Step::Open);
        assert_eq!(feed(&mut s, 4, "  g0  1.000 -0.093").unwrap(), Step::Open);
        assert_eq!(feed(&mut s, 5, "  g1 -0.093  1.000").unwrap(), Step::Open);
        assert_eq!(feed(&mut s, 6, "").unwrap(), Step::Closed);

        let m = s.seal();
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.rows[0][0].raw(), "1.000");
        assert_eq!(m.rows[0][1].raw(), "-0.093");
        assert_eq!(m.rows[1][0].raw(), "-0.093");
    }

    #[test]
    fn header_row_without_decimal_point_is_skipped() {
        let mut s = CorrSection::default();
        s.reset(2);
        feed(&mut s, 1, "      g0     g1").unwrap();
        assert!(!s.has_rows());
    }

    #[test]
    fn short_matrix_row_is_an_error() {
        let mut s = CorrSection::default();
        s.reset(3);
        let err = feed(&mut s, 4, "  g0  1.000 -0.093").unwrap_err();
        match err {
            ExtractError::ShortRow {
                line: 4,
                expected: 4,
                got: 3,
                ..
            } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn seal_empties_the_section_for_reuse() {
        let mut s = CorrSection::default();
        s.reset(1);
        feed(&mut s, 1, "  g0  1.000").unwrap();
        assert!(s.has_rows());
        let m = s.seal();
        assert_eq!(m.rows.len(), 1);
        assert!(!s.has_rows());
    }
}
