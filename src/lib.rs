//! Markov chain execution with exact checkpoint/resume, plus the numeric
//! precondition checks log-density code runs before computing anything.
//!
//! The runner drives an opaque transition kernel through a warmup or
//! sampling window with thinning, progress reporting and cooperative
//! cancellation; sampler adaptation state and rng state round-trip through a
//! checkpoint store so a chain resumes bit-for-bit. The check layer lifts
//! scalar predicates over scalar, vector and matrix inputs under either a
//! raising or a NaN-sentinel failure policy.

pub(crate) mod chain;
pub(crate) mod check;
pub(crate) mod checkpoint;
pub(crate) mod error;
pub(crate) mod metropolis;
pub(crate) mod progress;
pub(crate) mod runner;
pub(crate) mod writer;

pub use chain::{LogDensity, Sample, Sampler};
pub use check::{
    check_bounded, check_finite, check_nonnegative, check_positive, Elements, ErrorPolicy,
};
pub use checkpoint::{
    CheckpointStore, FileCheckpoint, MemoryCheckpoint, NullCheckpoint, Resumable,
};
pub use error::DomainError;
pub use metropolis::RandomWalkMetropolis;
pub use progress::print_progress;
pub use runner::{run_chain, run_parallel, ChainRun, RunOptions};
pub use writer::{MemoryWriter, SampleWriter};
