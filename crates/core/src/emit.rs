//! Mathematica `Dataset` output.
//!
//! Each run becomes one association on its own line inside a
//! `Dataset[{ ... }]` envelope. Numeric text is copied verbatim from
//! the log apart from the exponent rewrite: `e`/`E` becomes `*10^`,
//! which is the only transformation Mathematica needs to read the
//! simulator's scientific notation.

use std::borrow::Cow;
use std::io::Write;

use crate::error::ExtractError;
use crate::model::{CorrelationMatrix, Distribution, Run};

/// Rewrite C-style exponents for Mathematica, leaving everything else
/// untouched. Values without an exponent are borrowed as-is.
pub fn translate_exponent(raw: &str) -> Cow<'_, str> {
    if raw.contains(['e', 'E']) {
        Cow::Owned(raw.replace(['e', 'E'], "*10^"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Streaming writer for the dataset envelope.
pub struct Emitter<W: Write> {
    out: W,
    records: usize,
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Self {
        Emitter { out, records: 0 }
    }

    /// Open the envelope. Must be called once, before any record.
    pub fn begin(&mut self) -> Result<(), ExtractError> {
        self.out.write_all(b"Dataset[{\n")?;
        Ok(())
    }

    /// Write one run as a flat association. Records are separated by
    /// `,\n`; the separator precedes every record but the first.
    pub fn record(&mut self, run: &Run) -> Result<(), ExtractError> {
        if self.records > 0 {
            self.out.write_all(b",\n")?;
        }
        self.records += 1;

        self.out.write_all(b"<|\"param\" -> <|")?;
        for (i, (name, value)) in run.params.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b", ")?;
            }
            write!(self.out, "\"{}\" -> {}", name, translate_exponent(value.raw()))?;
        }
        self.out.write_all(b"|>")?;

        self.out.write_all(b", \"fdistn\" -> ")?;
        self.distn(&run.fitness)?;
        self.out.write_all(b", \"pdistn\" -> ")?;
        self.distn(&run.performance)?;

        self.out.write_all(b", \"gdistn\" -> <|")?;
        for (i, d) in run.genotype.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b", ")?;
            }
            write!(self.out, "\"g{}\" -> ", i)?;
            self.distn(d)?;
        }
        self.out.write_all(b"|>")?;

        self.out.write_all(b", \"gcorr\" -> ")?;
        self.matrix(&run.genotype_corr)?;

        if let Some(stoch) = &run.stochastic {
            self.out.write_all(b", \"sdistn\" -> <|")?;
            for (i, d) in stoch.distns.iter().enumerate() {
                if i > 0 {
                    self.out.write_all(b", ")?;
                }
                write!(self.out, "\"g{}\" -> ", i)?;
                self.distn(d)?;
            }
            self.out.write_all(b"|>")?;
            self.out.write_all(b", \"scorr\" -> ")?;
            self.matrix(&stoch.corr)?;
            self.out.write_all(b", \"sgcorr\" -> ")?;
            self.matrix(&stoch.genotype_corr)?;
        }

        self.out.write_all(b"|>")?;
        Ok(())
    }

    /// Close the envelope and flush.
    pub fn finish(&mut self) -> Result<(), ExtractError> {
        self.out.write_all(b"\n}]\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn distn(&mut self, d: &Distribution) -> Result<(), ExtractError> {
        write!(
            self.out,
            "<|\"mean\" -> {}, \"sd\" -> {}, \"ptile\" -> {{",
            translate_exponent(d.mean.raw()),
            translate_exponent(d.sd.raw())
        )?;
        for (i, (threshold, value)) in d.percentiles.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b", ")?;
            }
            write!(self.out, "{{{:?}, {}}}", threshold, translate_exponent(value.raw()))?;
        }
        self.out.write_all(b"}|>")?;
        Ok(())
    }

    fn matrix(&mut self, m: &CorrelationMatrix) -> Result<(), ExtractError> {
        self.out.write_all(b"{")?;
        for (i, row) in m.rows.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b", ")?;
            }
            self.out.write_all(b"{")?;
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    self.out.write_all(b", ")?;
                }
                write!(self.out, "{}", translate_exponent(value.raw()))?;
            }
            self.out.write_all(b"}")?;
        }
        self.out.write_all(b"}")?;
        Ok(())
    }
}
