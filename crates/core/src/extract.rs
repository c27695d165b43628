//! One-pass extraction: parse a summary log, stream the dataset out.

use std::io::{BufRead, Write};

use crate::emit::Emitter;
use crate::error::ExtractError;
use crate::line::{Line, RUN_MARKER};
use crate::parser::RunParser;

/// Parse `input` and write the Mathematica dataset to `out`, returning
/// the number of runs emitted. A log with no run blocks at all is an
/// error rather than an empty dataset; callers should discard whatever
/// output was written once this returns `Err`.
pub fn extract<R: BufRead, W: Write>(input: R, out: W) -> Result<usize, ExtractError> {
    let mut parser = RunParser::new();
    let mut emitter = Emitter::new(out);
    let mut count = 0;
    let mut number = 0;

    emitter.begin()?;
    for raw in input.lines() {
        let raw = raw?;
        number += 1;
        if let Some(run) = parser.feed(&Line::new(number, &raw))? {
            log_run(&run, number);
            emitter.record(&run)?;
            count += 1;
        }
    }
    if let Some(run) = parser.finish(number + 1)? {
        log_run(&run, number + 1);
        emitter.record(&run)?;
        count += 1;
    }
    if count == 0 {
        return Err(ExtractError::NoRuns);
    }
    emitter.finish()?;
    Ok(count)
}

fn log_run(run: &crate::model::Run, line: u32) {
    let id = run.params.get(RUN_MARKER).map(|v| v.raw()).unwrap_or("?");
    tracing::debug!(run = id, line, "run block complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_RUN: &str = "\
Run        =         7
loci       =         1

Fitness distribution

 Mean  9.0e-01
   SD  1.0e-02
 50.0  9.1e-01

Performance distribution

 Mean  2.0e+00
   SD  5.0e-01
 50.0  2.1e+00

Genotypic values

          g0
 Mean   0.5
   SD   0.1
 50.0   0.5


Genotypic correlations

      g0
  g0  1.000

";

    fn extract_str(input: &str) -> Result<(usize, String), ExtractError> {
        let mut out = Vec::new();
        let count = extract(input.as_bytes(), &mut out)?;
        Ok((count, String::from_utf8(out).unwrap()))
    }

    #[test]
    fn single_run_round_trips_through_the_envelope() {
        let (count, text) = extract_str(ONE_RUN).unwrap();
        assert_eq!(count, 1);
        assert!(text.starts_with("Dataset[{\n"));
        assert!(text.ends_with("|>\n}]\n"));
        assert!(text.contains("\"Run\" -> 7"));
        assert!(text.contains("\"fdistn\" -> <|\"mean\" -> 9.0*10^-01"));
    }

    #[test]
    fn input_without_any_run_is_an_error() {
        assert!(matches!(extract_str("").unwrap_err(), ExtractError::NoRuns));
        assert!(matches!(
            extract_str("banner\n\nnothing here\n").unwrap_err(),
            ExtractError::NoRuns
        ));
    }

    #[test]
    fn structural_errors_carry_the_line_number() {
        let src = ONE_RUN.replace("loci       =         1\n", "");
        match extract_str(&src).unwrap_err() {
            ExtractError::MissingLoci { line: 2 } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
