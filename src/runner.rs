use std::io::{self, Write};

use anyhow::{ensure, Context, Result};
use rand::Rng;
use rayon::prelude::*;

use crate::chain::{Sample, Sampler};
use crate::checkpoint::CheckpointStore;
use crate::progress::print_progress;
use crate::writer::SampleWriter;

/// Knobs for one call to [`run_chain`].
///
/// A run covers `num_iterations` iterations positioned at
/// `[window_start, window_start + num_iterations)` inside the overall
/// `[0, window_end)` schedule; the window only affects progress lines. The
/// caller makes two runs per chain: one with `warmup: true` (adaptation, not
/// recorded by convention) and one without.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub num_iterations: u64,
    pub window_start: u64,
    pub window_end: u64,
    /// Record every `num_thin`-th iteration. Must be at least 1.
    pub num_thin: u64,
    /// Emit a progress line every `refresh` iterations; 0 disables.
    pub refresh: u64,
    /// Hand recorded iterations to the writer.
    pub save: bool,
    pub warmup: bool,
    pub prefix: String,
    pub suffix: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            num_iterations: 1000,
            window_start: 0,
            window_end: 1000,
            num_thin: 1,
            refresh: 100,
            save: true,
            warmup: false,
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

/// Drives one Markov chain through `options.num_iterations` transitions and
/// returns the final state.
///
/// Non-warmup runs first restore sampler adaptation state and rng state from
/// the checkpoint store (a no-op if the store is empty), and persist the
/// initial-values snapshot, the adaptation state and the rng state after the
/// last iteration. Warmup runs never touch the store; the caller feeds the
/// returned state into the sampling-phase call.
///
/// Each iteration invokes the callback (the cooperative cancellation hook),
/// reports progress, advances the chain, and records the new state when
/// `save` is set and the iteration lands on the thinning grid. Any error
/// from a collaborator aborts the run as-is: no retry, no rollback of rows
/// already written.
#[allow(clippy::too_many_arguments)]
pub fn run_chain<S, M, R, W, C, F, O>(
    sampler: &mut S,
    options: &RunOptions,
    writer: &mut W,
    checkpoint: &mut C,
    init: Sample,
    model: &M,
    rng: &mut R,
    progress: &mut O,
    callback: &mut F,
) -> Result<Sample>
where
    S: Sampler,
    R: Rng,
    W: SampleWriter<S, M>,
    C: CheckpointStore<S, R, M>,
    F: FnMut() -> Result<()>,
    O: Write + ?Sized,
{
    ensure!(options.num_thin >= 1, "thinning interval must be at least 1");

    if !options.warmup {
        checkpoint
            .load_sampler_specific(sampler)
            .context("Failed to restore sampler adaptation state")?;
        checkpoint
            .load_rng(rng)
            .context("Failed to restore rng state")?;
    }

    let mut state = init;
    for m in 0..options.num_iterations {
        callback()?;

        print_progress(
            m,
            options.window_start,
            options.window_end,
            options.refresh,
            options.warmup,
            &options.prefix,
            &options.suffix,
            progress,
        )
        .context("Failed to write progress line")?;

        state = sampler.transition(state, rng)?;

        if options.save && m % options.num_thin == 0 {
            writer
                .write_sample_params(rng, &state, sampler, model)
                .context("Failed to record sample parameters")?;
            writer
                .write_diagnostic_params(&state, sampler)
                .context("Failed to record diagnostic parameters")?;
        }
    }

    if !options.warmup {
        checkpoint
            .save_inits(model, rng, &state)
            .context("Failed to persist initial values")?;
        checkpoint
            .save_sampler_specific(sampler)
            .context("Failed to persist sampler adaptation state")?;
        checkpoint
            .save_rng(rng)
            .context("Failed to persist rng state")?;
    }

    Ok(state)
}

/// Everything one chain owns when several run side by side.
#[derive(Debug)]
pub struct ChainRun<S, R, W, C> {
    pub sampler: S,
    pub rng: R,
    pub writer: W,
    pub checkpoint: C,
    pub init: Sample,
    pub options: RunOptions,
}

/// Runs independent chains in parallel against a shared model.
///
/// Chains share nothing mutable; each owns its sampler, rng, writer and
/// checkpoint store. Progress lines are suppressed (parallel chains would
/// interleave on one sink); `callback` is the shared cancellation hook,
/// polled once per iteration per chain. Each chain's bundle is returned next
/// to its outcome so writers and stores can be inspected afterwards.
pub fn run_parallel<S, M, R, W, C, F>(
    runs: Vec<ChainRun<S, R, W, C>>,
    model: &M,
    callback: F,
) -> Vec<(ChainRun<S, R, W, C>, Result<Sample>)>
where
    S: Sampler + Send,
    M: Sync,
    R: Rng + Send,
    W: SampleWriter<S, M> + Send,
    C: CheckpointStore<S, R, M> + Send,
    F: Fn() -> Result<()> + Sync,
{
    runs.into_par_iter()
        .map(|mut run| {
            let init = run.init.clone();
            let mut sink = io::sink();
            let mut chain_callback = || callback();
            let result = run_chain(
                &mut run.sampler,
                &run.options,
                &mut run.writer,
                &mut run.checkpoint,
                init,
                model,
                &mut run.rng,
                &mut sink,
                &mut chain_callback,
            );
            (run, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{MemoryCheckpoint, NullCheckpoint, Resumable};
    use crate::writer::MemoryWriter;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct StepSampler;

    impl Sampler for StepSampler {
        fn transition<R: Rng + ?Sized>(&mut self, state: Sample, _rng: &mut R) -> Result<Sample> {
            let mut params = state.params;
            for p in params.iter_mut() {
                *p += 1.0;
            }
            Ok(Sample::new(params, 0.0, 1.0))
        }
    }

    fn options(num_iterations: u64) -> RunOptions {
        RunOptions {
            num_iterations,
            window_end: num_iterations,
            refresh: 0,
            ..RunOptions::default()
        }
    }

    #[test]
    fn rejects_zero_thinning() {
        let mut sampler = StepSampler;
        let mut writer = MemoryWriter::new();
        let mut rng = SmallRng::seed_from_u64(0);
        let opts = RunOptions {
            num_thin: 0,
            ..options(5)
        };
        let result = run_chain(
            &mut sampler,
            &opts,
            &mut writer,
            &mut NullCheckpoint,
            Sample::new(vec![0.0], 0.0, 1.0),
            &(),
            &mut rng,
            &mut io::sink(),
            &mut || Ok(()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn zero_iterations_returns_the_initial_state() {
        let mut sampler = StepSampler;
        let mut writer = MemoryWriter::new();
        let mut rng = SmallRng::seed_from_u64(0);
        let init = Sample::new(vec![2.5], 0.0, 1.0);
        let out = run_chain(
            &mut sampler,
            &options(0),
            &mut writer,
            &mut NullCheckpoint,
            init.clone(),
            &(),
            &mut rng,
            &mut io::sink(),
            &mut || Ok(()),
        )
        .unwrap();
        assert_eq!(out, init);
        assert!(writer.samples().is_empty());
    }

    #[test]
    fn warmup_runs_do_not_touch_the_store() {
        // A wrapped rng stands in for a sampler with Resumable state.
        struct Wrap(ChaCha8Rng);
        impl Sampler for Wrap {
            fn transition<R: Rng + ?Sized>(
                &mut self,
                state: Sample,
                _rng: &mut R,
            ) -> Result<Sample> {
                Ok(state)
            }
        }
        impl Resumable for Wrap {
            fn save_state(&self) -> Vec<u8> {
                self.0.save_state()
            }
            fn restore_state(&mut self, state: &[u8]) -> Result<()> {
                self.0.restore_state(state)
            }
        }

        let mut wrapped = Wrap(ChaCha8Rng::seed_from_u64(1));
        let mut writer = MemoryWriter::new();
        let mut store = MemoryCheckpoint::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let opts = RunOptions {
            warmup: true,
            save: false,
            ..options(4)
        };
        run_chain(
            &mut wrapped,
            &opts,
            &mut writer,
            &mut store,
            Sample::new(vec![0.0], 0.0, 1.0),
            &(),
            &mut rng,
            &mut io::sink(),
            &mut || Ok(()),
        )
        .unwrap();
        assert!(store.inits().is_none());
    }
}
