//! Run-block state machine.
//!
//! A summary log is a sequence of run blocks, each opened by a `Run`
//! parameter line and closed by the end of its last correlation
//! matrix. [`RunParser`] is fed one classified [`Line`] at a time and
//! yields a completed [`Run`] as soon as the block's final section
//! closes, so records can be emitted without buffering the file.

use std::fmt;

use crate::error::ExtractError;
use crate::line::{Line, LineKind};
use crate::model::{
    CorrelationMatrix, Distribution, Numeric, ParamSet, Run, StochasticBlock, PARAM_LOCI,
    PARAM_STOCH_WEIGHT,
};

mod corr;
mod distn;

use corr::CorrSection;
pub use distn::Step;
use distn::{DistnSection, PerLocusSection};

/// Stochastic weights at or below this are treated as zero, matching
/// the simulator's own cutoff for skipping the stochastic sections.
pub const STOCH_THRESHOLD: f64 = 1e-6;

// ──────────────────────────────────────────────
// Sections
// ──────────────────────────────────────────────

/// Which part of a run block the parser is inside. Carried in every
/// structural error so a bad line can be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    /// Between runs; anything here but a `Run` line is ignored.
    #[default]
    AwaitRun,
    Params,
    FitnessDistn,
    PerformanceDistn,
    GenotypeDistn,
    GenotypeCorr,
    StochDistn,
    StochCorr,
    StochGenotypeCorr,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::AwaitRun => "preamble",
            Section::Params => "parameter block",
            Section::FitnessDistn => "fitness distribution",
            Section::PerformanceDistn => "performance distribution",
            Section::GenotypeDistn => "genotype distribution",
            Section::GenotypeCorr => "genotype correlation",
            Section::StochDistn => "stochastic distribution",
            Section::StochCorr => "stochastic correlation",
            Section::StochGenotypeCorr => "stochastic genotype correlation",
        };
        f.write_str(name)
    }
}

// ──────────────────────────────────────────────
// Run parser
// ──────────────────────────────────────────────

/// Sections collected so far for the run block being parsed.
#[derive(Debug, Default)]
struct PendingRun {
    params: ParamSet,
    fitness: Option<Distribution>,
    performance: Option<Distribution>,
    genotype: Vec<Distribution>,
    genotype_corr: Option<CorrelationMatrix>,
    stoch_distns: Vec<Distribution>,
    stoch_corr: Option<CorrelationMatrix>,
}

/// Incremental parser over classified lines.
#[derive(Debug, Default)]
pub struct RunParser {
    section: Section,
    /// Locus count from the current run's parameters; zero until the
    /// parameter block closes.
    loci: usize,
    /// Whether the current run carries the stochastic sections.
    stoch: bool,
    distn: DistnSection,
    per_locus: PerLocusSection,
    corr: CorrSection,
    pending: PendingRun,
}

impl RunParser {
    pub fn new() -> Self {
        RunParser::default()
    }

    /// Section the parser is currently inside.
    pub fn section(&self) -> Section {
        self.section
    }

    /// Feed one line; returns a completed run when this line closed
    /// the last section of its block.
    pub fn feed(&mut self, line: &Line) -> Result<Option<Run>, ExtractError> {
        match line.kind() {
            LineKind::RunStart => self.on_marker(line),
            LineKind::Blank | LineKind::Data => self.on_line(line),
        }
    }

    /// End of input. The final correlation matrix of the last run may
    /// lack its closing blank line; anything else left open means the
    /// log was cut short.
    pub fn finish(&mut self, line: u32) -> Result<Option<Run>, ExtractError> {
        match self.section {
            Section::AwaitRun => Ok(None),
            Section::GenotypeCorr if !self.stoch && self.corr.has_rows() => {
                let matrix = self.corr.seal();
                self.build_run(matrix, line).map(Some)
            }
            Section::StochGenotypeCorr if self.corr.has_rows() => {
                let matrix = self.corr.seal();
                self.finish_stoch(matrix, line).map(Some)
            }
            section => Err(ExtractError::Truncated { line, section }),
        }
    }

    // A `Run` line both opens a new block and is the block's first
    // parameter line.
    fn on_marker(&mut self, line: &Line) -> Result<Option<Run>, ExtractError> {
        if self.section != Section::AwaitRun {
            return Err(ExtractError::Truncated {
                line: line.number,
                section: self.section,
            });
        }
        self.section = Section::Params;
        self.push_param(line)?;
        Ok(None)
    }

    fn on_line(&mut self, line: &Line) -> Result<Option<Run>, ExtractError> {
        match self.section {
            Section::AwaitRun => Ok(None),
            Section::Params => {
                if line.kind() == LineKind::Blank {
                    self.close_params(line.number)?;
                } else {
                    self.push_param(line)?;
                }
                Ok(None)
            }
            Section::FitnessDistn => {
                if self.distn.consume(line, self.section)? == Step::Closed {
                    self.pending.fitness = Some(self.distn.seal(line.number, self.section)?);
                    self.section = Section::PerformanceDistn;
                }
                Ok(None)
            }
            Section::PerformanceDistn => {
                if self.distn.consume(line, self.section)? == Step::Closed {
                    self.pending.performance = Some(self.distn.seal(line.number, self.section)?);
                    self.section = Section::GenotypeDistn;
                    self.per_locus.reset(self.loci);
                }
                Ok(None)
            }
            Section::GenotypeDistn => {
                if self.per_locus.consume(line, self.section)? == Step::Closed {
                    self.pending.genotype = self.per_locus.seal(line.number, self.section)?;
                    self.section = Section::GenotypeCorr;
                    self.corr.reset(self.loci);
                }
                Ok(None)
            }
            Section::GenotypeCorr => {
                if self.corr.consume(line, self.section)? == Step::Closed {
                    let matrix = self.corr.seal();
                    if self.stoch {
                        self.pending.genotype_corr = Some(matrix);
                        self.section = Section::StochDistn;
                        self.per_locus.reset(self.loci);
                        return Ok(None);
                    }
                    return self.build_run(matrix, line.number).map(Some);
                }
                Ok(None)
            }
            Section::StochDistn => {
                if self.per_locus.consume(line, self.section)? == Step::Closed {
                    self.pending.stoch_distns = self.per_locus.seal(line.number, self.section)?;
                    self.section = Section::StochCorr;
                    self.corr.reset(self.loci);
                }
                Ok(None)
            }
            Section::StochCorr => {
                if self.corr.consume(line, self.section)? == Step::Closed {
                    self.pending.stoch_corr = Some(self.corr.seal());
                    self.section = Section::StochGenotypeCorr;
                    self.corr.reset(self.loci);
                }
                Ok(None)
            }
            Section::StochGenotypeCorr => {
                if self.corr.consume(line, self.section)? == Step::Closed {
                    let matrix = self.corr.seal();
                    return self.finish_stoch(matrix, line.number).map(Some);
                }
                Ok(None)
            }
        }
    }

    fn push_param(&mut self, line: &Line) -> Result<(), ExtractError> {
        if line.fields.len() < 3 {
            return Err(ExtractError::ParamFields {
                line: line.number,
                got: line.fields.len(),
            });
        }
        // `name = value`; anything past the value is ignored.
        self.pending
            .params
            .push(line.fields[0], Numeric::from(line.fields[2]));
        Ok(())
    }

    /// The blank after the parameter block fixes the locus count and
    /// the stochastic flag for the rest of the run.
    fn close_params(&mut self, line: u32) -> Result<(), ExtractError> {
        let loci = match self.pending.params.get(PARAM_LOCI) {
            None => return Err(ExtractError::MissingLoci { line }),
            Some(value) => match value.raw().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ExtractError::InvalidLoci {
                        line,
                        value: value.raw().to_owned(),
                    })
                }
            },
        };
        self.stoch = match self.pending.params.get(PARAM_STOCH_WEIGHT) {
            None => false,
            Some(value) => match value.to_f64() {
                Some(weight) => weight > STOCH_THRESHOLD,
                None => {
                    return Err(ExtractError::InvalidStochWeight {
                        line,
                        value: value.raw().to_owned(),
                    })
                }
            },
        };
        self.loci = loci;
        self.section = Section::FitnessDistn;
        Ok(())
    }

    fn build_run(
        &mut self,
        genotype_corr: CorrelationMatrix,
        line: u32,
    ) -> Result<Run, ExtractError> {
        let pending = std::mem::take(&mut self.pending);
        self.section = Section::AwaitRun;
        self.loci = 0;
        self.stoch = false;

        let truncated = |section| ExtractError::Truncated { line, section };
        Ok(Run {
            params: pending.params,
            fitness: pending
                .fitness
                .ok_or_else(|| truncated(Section::FitnessDistn))?,
            performance: pending
                .performance
                .ok_or_else(|| truncated(Section::PerformanceDistn))?,
            genotype: pending.genotype,
            genotype_corr,
            stochastic: None,
        })
    }

    fn finish_stoch(
        &mut self,
        genotype_corr: CorrelationMatrix,
        line: u32,
    ) -> Result<Run, ExtractError> {
        let distns = std::mem::take(&mut self.pending.stoch_distns);
        let corr = self
            .pending
            .stoch_corr
            .take()
            .ok_or(ExtractError::Truncated {
                line,
                section: Section::StochCorr,
            })?;
        let plain_corr = self
            .pending
            .genotype_corr
            .take()
            .ok_or(ExtractError::Truncated {
                line,
                section: Section::GenotypeCorr,
            })?;
        let mut run = self.build_run(plain_corr, line)?;
        run.stochastic = Some(StochasticBlock {
            distns,
            corr,
            genotype_corr,
        });
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a whole document line by line, finishing at end of input.
    fn parse_all(src: &str) -> Result<Vec<Run>, ExtractError> {
        let mut parser = RunParser::new();
        let mut runs = Vec::new();
        let mut number = 0;
        for raw in src.lines() {
            number += 1;
            if let Some(run) = parser.feed(&Line::new(number, raw))? {
                runs.push(run);
            }
        }
        if let Some(run) = parser.finish(number + 1)? {
            runs.push(run);
        }
        Ok(runs)
    }

    const PLAIN_RUN: &str = "\
Run        =         1
loci       =         2
popSz      =      1000
stochWt    = 0.000e+00

Fitness distribution

 Mean  9.442e-01
   SD  1.283e-02
  0.0  9.013e-01
 50.0  9.458e-01
100.0  9.680e-01

Performance distribution

 Mean  2.944e+00
   SD  5.122e-01
  0.0  1.205e+00
 50.0  2.961e+00
100.0  4.543e+00

Genotypic values

          g0      g1
 Mean   0.530   0.518
   SD   0.037   0.041
  0.0   0.427   0.380
 50.0   0.531   0.519
100.0   0.635   0.654


Genotypic correlations

      g0     g1
  g0  1.000 -0.093
  g1 -0.093  1.000

";

    const STOCH_TAIL: &str = "\
Stochastic values

          g0      g1
 Mean   0.128   0.114
   SD   0.022   0.019
  0.0   0.061   0.058
 50.0   0.126   0.113
100.0   0.199   0.180


Stochastic correlations

      g0     g1
  g0  1.000  0.041
  g1  0.041  1.000


Stochastic genotypic correlations

      g0     g1
  g0  1.000 -0.007
  g1 -0.007  1.000

";

    fn stoch_run() -> String {
        let mut src = PLAIN_RUN.replace("stochWt    = 0.000e+00", "stochWt    = 5.000e-01");
        src.push('\n');
        src.push_str(STOCH_TAIL);
        src
    }

    #[test]
    fn plain_run_parses_every_section() {
        let runs = parse_all(PLAIN_RUN).unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.params.get("Run").unwrap().raw(), "1");
        assert_eq!(run.params.loci(), Some(2));
        assert_eq!(run.fitness.mean.raw(), "9.442e-01");
        assert_eq!(run.performance.percentiles.len(), 3);
        assert_eq!(run.genotype.len(), 2);
        assert_eq!(run.genotype[1].sd.raw(), "0.041");
        assert_eq!(run.genotype_corr.rows[0][1].raw(), "-0.093");
        assert!(run.stochastic.is_none());
    }

    #[test]
    fn zero_stoch_weight_skips_the_stochastic_sections() {
        let runs = parse_all(PLAIN_RUN).unwrap();
        assert!(runs[0].stochastic.is_none());
    }

    #[test]
    fn positive_stoch_weight_collects_the_stochastic_trio() {
        let runs = parse_all(&stoch_run()).unwrap();
        assert_eq!(runs.len(), 1);
        let stoch = runs[0].stochastic.as_ref().unwrap();
        assert_eq!(stoch.distns.len(), 2);
        assert_eq!(stoch.distns[0].mean.raw(), "0.128");
        assert_eq!(stoch.corr.rows[0][1].raw(), "0.041");
        assert_eq!(stoch.genotype_corr.rows[1][0].raw(), "-0.007");
    }

    #[test]
    fn preamble_noise_is_ignored() {
        let mut src = String::from("simulation build 2024-11-02\nseed: 991\n\n");
        src.push_str(PLAIN_RUN);
        let runs = parse_all(&src).unwrap();
        assert_eq!(runs.len(), 1);
    }

    #[test]
    fn two_runs_come_out_in_order() {
        let mut src = String::from(PLAIN_RUN);
        src.push('\n');
        src.push_str(&PLAIN_RUN.replace("Run        =         1", "Run        =         2"));
        let runs = parse_all(&src).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].params.get("Run").unwrap().raw(), "1");
        assert_eq!(runs[1].params.get("Run").unwrap().raw(), "2");
    }

    #[test]
    fn final_matrix_may_end_at_eof_without_a_blank() {
        let src = PLAIN_RUN.trim_end();
        let runs = parse_all(src).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].genotype_corr.rows.len(), 2);
    }

    #[test]
    fn missing_loci_parameter_is_an_error() {
        let src = PLAIN_RUN.replace("loci       =         2\n", "");
        let err = parse_all(&src).unwrap_err();
        assert!(matches!(err, ExtractError::MissingLoci { .. }));
    }

    #[test]
    fn non_numeric_loci_is_an_error() {
        let src = PLAIN_RUN.replace("loci       =         2", "loci       =      many");
        let err = parse_all(&src).unwrap_err();
        match err {
            ExtractError::InvalidLoci { value, .. } => assert_eq!(value, "many"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_stoch_weight_is_an_error() {
        let src = PLAIN_RUN.replace("stochWt    = 0.000e+00", "stochWt    =       off");
        let err = parse_all(&src).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidStochWeight { .. }));
    }

    #[test]
    fn short_param_line_is_an_error() {
        let src = PLAIN_RUN.replace("popSz      =      1000", "popSz");
        let err = parse_all(&src).unwrap_err();
        match err {
            ExtractError::ParamFields { line: 3, got: 1 } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn marker_inside_a_section_is_a_truncation_error() {
        let cut = PLAIN_RUN.find("Performance").unwrap();
        let mut src = String::from(&PLAIN_RUN[..cut]);
        src.push_str("Run        =         2\n");
        let err = parse_all(&src).unwrap_err();
        match err {
            ExtractError::Truncated { section, .. } => {
                assert_eq!(section, Section::PerformanceDistn)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn input_ending_mid_section_is_a_truncation_error() {
        let cut = PLAIN_RUN.find("   SD  1.283e-02").unwrap();
        let err = parse_all(&PLAIN_RUN[..cut]).unwrap_err();
        match err {
            ExtractError::Truncated { section, .. } => {
                assert_eq!(section, Section::FitnessDistn)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn stochastic_run_truncated_before_last_matrix_is_an_error() {
        let src = stoch_run();
        let cut = src.find("Stochastic genotypic").unwrap();
        let err = parse_all(&src[..cut]).unwrap_err();
        assert!(matches!(err, ExtractError::Truncated { .. }));
    }

    #[test]
    fn empty_input_yields_no_runs() {
        assert!(parse_all("").unwrap().is_empty());
        assert!(parse_all("banner only\n\n").unwrap().is_empty());
    }
}
