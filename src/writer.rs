use anyhow::Result;
use rand::Rng;

use crate::chain::{Sample, Sampler};

/// Recording seam for draws and their diagnostics.
///
/// Both calls are fire-and-forget: the runner invokes them for every
/// recorded iteration and otherwise ignores the writer. Implementations must
/// not mutate the sample. On-disk formats belong to the implementation, not
/// to this crate.
pub trait SampleWriter<S, M> {
    fn write_sample_params<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        sample: &Sample,
        sampler: &S,
        model: &M,
    ) -> Result<()>;

    fn write_diagnostic_params(&mut self, sample: &Sample, sampler: &S) -> Result<()>;
}

/// Writer that keeps every recorded row in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    samples: Vec<Vec<f64>>,
    diagnostics: Vec<Vec<f64>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    /// One row per recorded draw: log density, acceptance probability, then
    /// whatever the sampler reports via [`Sampler::diagnostics`].
    pub fn diagnostics(&self) -> &[Vec<f64>] {
        &self.diagnostics
    }
}

impl<S: Sampler, M> SampleWriter<S, M> for MemoryWriter {
    fn write_sample_params<R: Rng + ?Sized>(
        &mut self,
        _rng: &mut R,
        sample: &Sample,
        _sampler: &S,
        _model: &M,
    ) -> Result<()> {
        self.samples.push(sample.params.clone());
        Ok(())
    }

    fn write_diagnostic_params(&mut self, sample: &Sample, sampler: &S) -> Result<()> {
        let mut row = vec![sample.logp, sample.accept_prob];
        row.extend(sampler.diagnostics());
        self.diagnostics.push(row);
        Ok(())
    }
}
