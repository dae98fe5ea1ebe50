use anyhow::Result;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::chain::{LogDensity, Sample, Sampler};
use crate::check::{check_finite, check_positive, ErrorPolicy};
use crate::checkpoint::Resumable;
use crate::error::DomainError;

const TARGET_ACCEPT: f64 = 0.234;

// scale (8) + draw count (8) + acceptance sum (8)
const STATE_LEN: usize = 24;

/// Random-walk Metropolis kernel with an isotropic Gaussian proposal.
///
/// While adaptation is enabled the proposal scale follows a Robbins-Monro
/// recursion toward the classic 0.234 acceptance target; drivers enable it
/// for warmup and disable it before sampling. The adaptation bookkeeping is
/// the sampler's [`Resumable`] state.
#[derive(Debug, Clone)]
pub struct RandomWalkMetropolis<M> {
    target: M,
    scale: f64,
    adapt_enabled: bool,
    draw_count: u64,
    accept_sum: f64,
}

impl<M: LogDensity> RandomWalkMetropolis<M> {
    pub fn new(target: M, scale: f64) -> Result<Self, DomainError> {
        let mut unused = f64::NAN;
        check_positive(
            "RandomWalkMetropolis::new",
            &scale,
            &mut unused,
            ErrorPolicy::Raise,
        )?;
        Ok(RandomWalkMetropolis {
            target,
            scale,
            adapt_enabled: false,
            draw_count: 0,
            accept_sum: 0.0,
        })
    }

    /// Builds the chain state for a starting position, rejecting positions
    /// of the wrong dimension or with non-finite coordinates before the
    /// first density evaluation.
    pub fn init_sample(&self, position: &[f64]) -> Result<Sample> {
        anyhow::ensure!(
            position.len() == self.target.dim(),
            "initial position has {} coordinates, model expects {}",
            position.len(),
            self.target.dim()
        );
        let mut unused = f64::NAN;
        check_finite(
            "RandomWalkMetropolis::init_sample",
            position,
            &mut unused,
            ErrorPolicy::Raise,
        )?;
        let logp = self.target.logp(position)?;
        Ok(Sample::new(position.to_vec(), logp, 1.0))
    }

    pub fn enable_adaptation(&mut self) {
        self.adapt_enabled = true;
    }

    pub fn disable_adaptation(&mut self) {
        self.adapt_enabled = false;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Mean acceptance probability over all draws so far.
    pub fn mean_accept(&self) -> f64 {
        if self.draw_count == 0 {
            return f64::NAN;
        }
        self.accept_sum / self.draw_count as f64
    }
}

impl<M: LogDensity> Sampler for RandomWalkMetropolis<M> {
    fn transition<R: Rng + ?Sized>(&mut self, state: Sample, rng: &mut R) -> Result<Sample> {
        let current_logp = self.target.logp(&state.params)?;

        let mut proposal = state.params.clone();
        for x in proposal.iter_mut() {
            let step: f64 = rng.sample(StandardNormal);
            *x += self.scale * step;
        }
        let proposal_logp = self.target.logp(&proposal)?;

        let log_ratio = proposal_logp - current_logp;
        let accept_prob = log_ratio.exp().min(1.0);
        let u: f64 = rng.random();
        let (params, logp) = if u.ln() < log_ratio {
            (proposal, proposal_logp)
        } else {
            (state.params, current_logp)
        };

        self.accept_sum += accept_prob;
        if self.adapt_enabled {
            let eta = (self.draw_count as f64 + 1.0).powf(-0.6);
            self.scale *= ((accept_prob - TARGET_ACCEPT) * eta).exp();
        }
        self.draw_count += 1;

        Ok(Sample::new(params, logp, accept_prob))
    }

    fn diagnostics(&self) -> Vec<f64> {
        vec![self.scale]
    }
}

impl<M> Resumable for RandomWalkMetropolis<M> {
    fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(STATE_LEN);
        state.extend_from_slice(&self.scale.to_le_bytes());
        state.extend_from_slice(&self.draw_count.to_le_bytes());
        state.extend_from_slice(&self.accept_sum.to_le_bytes());
        state
    }

    fn restore_state(&mut self, state: &[u8]) -> Result<()> {
        anyhow::ensure!(
            state.len() == STATE_LEN,
            "sampler state blob has {} bytes, expected {}",
            state.len(),
            STATE_LEN
        );
        self.scale = f64::from_le_bytes(state[..8].try_into()?);
        self.draw_count = u64::from_le_bytes(state[8..16].try_into()?);
        self.accept_sum = f64::from_le_bytes(state[16..24].try_into()?);
        Ok(())
    }
}
