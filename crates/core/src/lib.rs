//! sumstat-core: simulation summary-log extraction library.
//!
//! Turns the text logs written by the sensitivity simulator into
//! Mathematica `Dataset` expressions, one association per run.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`extract()`] -- parse a log and stream the dataset out
//! - [`RunParser`] -- incremental run-block parser
//! - [`Emitter`] -- dataset writer
//! - [`ExtractError`] -- extraction error type
//! - Model types: [`Run`], [`Distribution`], [`CorrelationMatrix`],
//!   [`StochasticBlock`], [`ParamSet`], [`Numeric`]
//!
//! Line classification ([`Line`], [`LineKind`]) is exported for
//! callers that want to drive the parser themselves.

pub mod emit;
pub mod error;
pub mod extract;
pub mod line;
pub mod model;
pub mod parser;

// ── Convenience re-exports: key types ────────────────────────────────

pub use emit::Emitter;
pub use error::ExtractError;
pub use line::{Line, LineKind};
pub use model::{CorrelationMatrix, Distribution, Numeric, ParamSet, Run, StochasticBlock};
pub use parser::{RunParser, Section};

// ── Convenience re-exports: pipeline entry point ─────────────────────

pub use extract::extract;
