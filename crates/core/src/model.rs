//! Typed records assembled by the parser and consumed by the emitter.

use std::fmt;

/// Parameter key giving the per-locus collection cardinality.
pub const PARAM_LOCI: &str = "loci";
/// Parameter key whose near-zero test gates the stochastic sections.
pub const PARAM_STOCH_WEIGHT: &str = "stochWt";

/// A numeric field carried as its verbatim source text.
///
/// Values pass from the log to the output without arithmetic, so they
/// are kept as strings to preserve the exact upstream representation,
/// scientific notation included. `to_f64` parses lazily for the few
/// places that need to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numeric(String);

impl Numeric {
    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }
}

impl From<&str> for Numeric {
    fn from(s: &str) -> Self {
        Numeric(s.to_owned())
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameter block of one run: `name = value` pairs in input order.
///
/// Order is preserved for emission; lookup returns the first match.
#[derive(Debug, Default)]
pub struct ParamSet {
    pairs: Vec<(String, Numeric)>,
}

impl ParamSet {
    pub fn push(&mut self, key: &str, value: Numeric) {
        self.pairs.push((key.to_owned(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Numeric> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Numeric)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of loci, when present and a positive integer.
    pub fn loci(&self) -> Option<usize> {
        self.get(PARAM_LOCI)
            .and_then(|v| v.raw().parse().ok())
            .filter(|&n| n > 0)
    }

    /// Stochastic weight, when present and numeric.
    pub fn stoch_weight(&self) -> Option<f64> {
        self.get(PARAM_STOCH_WEIGHT).and_then(Numeric::to_f64)
    }
}

/// Statistical summary of one variable: mean, standard deviation, and
/// an ordered percentile table.
///
/// Invariant: `percentiles` is non-empty and both statistics are set by
/// the time the owning section closes. Only the threshold column is
/// parsed as a float; the value column stays verbatim.
#[derive(Debug)]
pub struct Distribution {
    pub mean: Numeric,
    pub sd: Numeric,
    /// `(threshold, value)` pairs in input order.
    pub percentiles: Vec<(f64, Numeric)>,
}

/// Square table of pairwise correlations among loci, row-major.
/// Row labels from the log (`g0`, `g1`, ...) are not stored.
#[derive(Debug, Default)]
pub struct CorrelationMatrix {
    pub rows: Vec<Vec<Numeric>>,
}

/// The conditional trio of stochastic sections, present only when the
/// run's `stochWt` exceeds the near-zero threshold.
#[derive(Debug)]
pub struct StochasticBlock {
    /// One distribution per locus.
    pub distns: Vec<Distribution>,
    pub corr: CorrelationMatrix,
    pub genotype_corr: CorrelationMatrix,
}

/// One simulation replicate, fully assembled and immutable once handed
/// to the emitter.
#[derive(Debug)]
pub struct Run {
    pub params: ParamSet,
    pub fitness: Distribution,
    pub performance: Distribution,
    /// One distribution per locus.
    pub genotype: Vec<Distribution>,
    pub genotype_corr: CorrelationMatrix,
    pub stochastic: Option<StochasticBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keeps_verbatim_text() {
        let n = Numeric::from("9.442e-01");
        assert_eq!(n.raw(), "9.442e-01");
        assert_eq!(n.to_string(), "9.442e-01");
        assert!((n.to_f64().unwrap() - 0.9442).abs() < 1e-12);
    }

    #[test]
    fn numeric_to_f64_fails_on_garbage() {
        assert_eq!(Numeric::from("g0").to_f64(), None);
    }

    #[test]
    fn param_set_preserves_order_and_first_match() {
        let mut params = ParamSet::default();
        params.push("Run", Numeric::from("1"));
        params.push("loci", Numeric::from("4"));
        params.push("loci", Numeric::from("9"));
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Run", "loci", "loci"]);
        assert_eq!(params.get("loci").unwrap().raw(), "4");
    }

    #[test]
    fn loci_accessor_rejects_non_positive_and_non_integer() {
        let mut params = ParamSet::default();
        params.push("loci", Numeric::from("0"));
        assert_eq!(params.loci(), None);

        let mut params = ParamSet::default();
        params.push("loci", Numeric::from("2.5"));
        assert_eq!(params.loci(), None);

        let mut params = ParamSet::default();
        params.push("loci", Numeric::from("3"));
        assert_eq!(params.loci(), Some(3));
    }

    #[test]
    fn stoch_weight_absent_is_none() {
        let params = ParamSet::default();
        assert_eq!(params.stoch_weight(), None);

        let mut params = ParamSet::default();
        params.push("stochWt", Numeric::from("5.000e-01"));
        assert!((params.stoch_weight().unwrap() - 0.5).abs() < 1e-12);
    }
}
