use anyhow::Result;
use rand::Rng;

/// One realized draw of the chain: the parameter values at the current
/// position plus the auxiliary scalars the sampler produced alongside them.
///
/// A `Sample` is created fresh by each transition, handed to the writer if
/// the iteration is recorded, and then becomes the input of the next
/// transition. The runner never retains it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub params: Vec<f64>,
    pub logp: f64,
    pub accept_prob: f64,
}

impl Sample {
    pub fn new(params: Vec<f64>, logp: f64, accept_prob: f64) -> Self {
        Sample {
            params,
            logp,
            accept_prob,
        }
    }
}

/// A Markov transition kernel.
///
/// Implementations may mutate internal adaptation bookkeeping, but the chain
/// position itself only moves through the returned `Sample`. A transition
/// must be deterministic given the sampler's internal state and the RNG's
/// next draws.
pub trait Sampler {
    fn transition<R: Rng + ?Sized>(&mut self, state: Sample, rng: &mut R) -> Result<Sample>;

    /// Sampler-internal quantities recorded with each diagnostic row, for
    /// example the current proposal scale or step size.
    fn diagnostics(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// The model seam: an unnormalized log-density over a fixed-dimensional
/// parameter space.
///
/// The chain runner never inspects the model; it only passes it through to
/// the writer and the checkpoint store. Samplers evaluate it.
pub trait LogDensity {
    fn dim(&self) -> usize;

    fn logp(&self, position: &[f64]) -> Result<f64>;
}
