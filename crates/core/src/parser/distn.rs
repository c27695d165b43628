//! Mean/SD/percentile accumulation for distribution sections.
//!
//! Both section shapes share one rule set: a `Mean` or `SD` line
//! records that statistic and arms percentile collection; armed data
//! lines append `(threshold, value)` rows; a blank line while armed
//! closes the section. Lines before the statistics (headings, column
//! headers) are noise and are skipped.

use crate::error::ExtractError;
use crate::line::Line;
use crate::model::{Distribution, Numeric};
use crate::parser::Section;

/// Leading field of a mean statistic line.
const STAT_MEAN: &str = "Mean";
/// Leading field of a standard-deviation statistic line.
const STAT_SD: &str = "SD";

/// Whether a section is still collecting after a line, or was closed
/// by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Open,
    Closed,
}

/// One variable's in-progress summary.
#[derive(Debug, Default)]
struct StatAccum {
    mean: Option<Numeric>,
    sd: Option<Numeric>,
    percentiles: Vec<(f64, Numeric)>,
}

impl StatAccum {
    fn set_stat(&mut self, name: &str, value: &str) {
        let slot = if name == STAT_MEAN {
            &mut self.mean
        } else {
            &mut self.sd
        };
        *slot = Some(Numeric::from(value));
    }

    fn push_percentile(
        &mut self,
        threshold: f64,
        value: &str,
        line: u32,
        section: Section,
    ) -> Result<(), ExtractError> {
        let missing = if self.mean.is_none() {
            STAT_MEAN
        } else if self.sd.is_none() {
            STAT_SD
        } else {
            self.percentiles.push((threshold, Numeric::from(value)));
            return Ok(());
        };
        Err(ExtractError::PercentileBeforeStats {
            line,
            section,
            missing,
        })
    }

    fn seal(self, line: u32, section: Section) -> Result<Distribution, ExtractError> {
        let mean = self.mean.ok_or(ExtractError::MissingStat {
            line,
            section,
            stat: STAT_MEAN,
        })?;
        let sd = self.sd.ok_or(ExtractError::MissingStat {
            line,
            section,
            stat: STAT_SD,
        })?;
        if self.percentiles.is_empty() {
            return Err(ExtractError::NoPercentiles { line, section });
        }
        Ok(Distribution {
            mean,
            sd,
            percentiles: self.percentiles,
        })
    }
}

/// Scalar distribution section (fitness, performance): one variable,
/// the statistic at field 1, percentile rows as `threshold value`.
#[derive(Debug, Default)]
pub struct DistnSection {
    acc: StatAccum,
    armed: bool,
}

impl DistnSection {
    /// Feed one line. `Closed` means a blank arrived while armed; the
    /// accumulated distribution is then taken with [`DistnSection::seal`].
    pub fn consume(&mut self, line: &Line, section: Section) -> Result<Step, ExtractError> {
        let fields = &line.fields;
        let first = match fields.first() {
            None => return Ok(self.blank()),
            Some(&first) => first,
        };
        if first == STAT_MEAN || first == STAT_SD {
            match fields.get(1) {
                Some(&value) => self.acc.set_stat(first, value),
                None => return Err(short_row(line, section, 2)),
            }
            self.armed = true;
        } else if self.armed {
            if fields.len() < 2 {
                return Err(short_row(line, section, 2));
            }
            let threshold = parse_threshold(fields[0], line.number, section)?;
            self.acc
                .push_percentile(threshold, fields[1], line.number, section)?;
        }
        Ok(Step::Open)
    }

    pub fn seal(&mut self, line: u32, section: Section) -> Result<Distribution, ExtractError> {
        std::mem::take(&mut self.acc).seal(line, section)
    }

    fn blank(&mut self) -> Step {
        if self.armed {
            self.armed = false;
            Step::Closed
        } else {
            Step::Open
        }
    }
}

/// Per-locus distribution section (genotype, stochastic): `loci`
/// parallel accumulators updated in lock-step, one field per locus at
/// field index locus + 1.
///
/// Invariant: all accumulators open and close together, driven by the
/// one shared armed flag, because the log writes every locus's value
/// on the same row and closes all loci with the same blank line.
#[derive(Debug, Default)]
pub struct PerLocusSection {
    accs: Vec<StatAccum>,
    armed: bool,
}

impl PerLocusSection {
    /// Size the accumulators for a section about to start.
    pub fn reset(&mut self, loci: usize) {
        self.accs.clear();
        self.accs.resize_with(loci, StatAccum::default);
        self.armed = false;
    }

    pub fn consume(&mut self, line: &Line, section: Section) -> Result<Step, ExtractError> {
        let fields = &line.fields;
        let first = match fields.first() {
            None => return Ok(self.blank()),
            Some(&first) => first,
        };
        let is_stat = first == STAT_MEAN || first == STAT_SD;
        if !is_stat && !self.armed {
            // Heading or column-header noise before the statistics.
            return Ok(Step::Open);
        }
        if fields.len() < self.accs.len() + 1 {
            return Err(short_row(line, section, self.accs.len() + 1));
        }
        if is_stat {
            for (i, acc) in self.accs.iter_mut().enumerate() {
                acc.set_stat(first, fields[i + 1]);
            }
            self.armed = true;
        } else {
            let threshold = parse_threshold(fields[0], line.number, section)?;
            for (i, acc) in self.accs.iter_mut().enumerate() {
                acc.push_percentile(threshold, fields[i + 1], line.number, section)?;
            }
        }
        Ok(Step::Open)
    }

    /// Take the closed accumulators as one distribution per locus.
    pub fn seal(
        &mut self,
        line: u32,
        section: Section,
    ) -> Result<Vec<Distribution>, ExtractError> {
        std::mem::take(&mut self.accs)
            .into_iter()
            .map(|acc| acc.seal(line, section))
            .collect()
    }

    fn blank(&mut self) -> Step {
        if self.armed {
            self.armed = false;
            Step::Closed
        } else {
            Step::Open
        }
    }
}

fn parse_threshold(field: &str, line: u32, section: Section) -> Result<f64, ExtractError> {
    field.parse().map_err(|_| ExtractError::Threshold {
        line,
        section,
        value: field.to_owned(),
    })
}

fn short_row(line: &Line, section: Section, expected: usize) -> ExtractError {
    ExtractError::ShortRow {
        line: line.number,
        section,
        expected,
        got: line.fields.len(),
    }
}
