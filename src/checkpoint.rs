use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use itertools::Itertools;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::chain::Sample;

/// Save/restore of internal state as an opaque blob.
///
/// Samplers implement this for their adaptation bookkeeping and random
/// sources for their generator state; the checkpoint store composes the two
/// without knowing what is inside either blob. A restore must be lossless:
/// restoring a saved blob reproduces the exact future behavior of the
/// saved instance.
pub trait Resumable {
    fn save_state(&self) -> Vec<u8>;

    fn restore_state(&mut self, state: &[u8]) -> Result<()>;
}

// seed (32) + stream (8) + word position (16)
const RNG_STATE_LEN: usize = 56;

impl Resumable for ChaCha8Rng {
    fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(RNG_STATE_LEN);
        state.extend_from_slice(&self.get_seed());
        state.extend_from_slice(&self.get_stream().to_le_bytes());
        state.extend_from_slice(&self.get_word_pos().to_le_bytes());
        state
    }

    fn restore_state(&mut self, state: &[u8]) -> Result<()> {
        ensure!(
            state.len() == RNG_STATE_LEN,
            "rng state blob has {} bytes, expected {}",
            state.len(),
            RNG_STATE_LEN
        );
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&state[..32]);
        let stream = u64::from_le_bytes(state[32..40].try_into()?);
        let word_pos = u128::from_le_bytes(state[40..56].try_into()?);
        let mut rng = ChaCha8Rng::from_seed(seed);
        rng.set_stream(stream);
        rng.set_word_pos(word_pos);
        *self = rng;
        Ok(())
    }
}

/// Where the runner persists and restores what a chain needs to resume:
/// sampler-specific adaptation state, random source state, and the
/// initial-values snapshot a driver feeds into the next run.
///
/// Each operation is atomic from the runner's point of view; a failed save
/// fails the run. Loading from a store that holds nothing is a no-op, so a
/// first sampling run and a resumed one share the same code path.
pub trait CheckpointStore<S, R, M> {
    fn load_sampler_specific(&mut self, sampler: &mut S) -> Result<()>;

    fn load_rng(&mut self, rng: &mut R) -> Result<()>;

    fn save_inits(&mut self, model: &M, rng: &mut R, state: &Sample) -> Result<()>;

    fn save_sampler_specific(&mut self, sampler: &S) -> Result<()>;

    fn save_rng(&mut self, rng: &R) -> Result<()>;
}

/// Store for runs that neither resume nor persist anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCheckpoint;

impl<S, R, M> CheckpointStore<S, R, M> for NullCheckpoint {
    fn load_sampler_specific(&mut self, _sampler: &mut S) -> Result<()> {
        Ok(())
    }

    fn load_rng(&mut self, _rng: &mut R) -> Result<()> {
        Ok(())
    }

    fn save_inits(&mut self, _model: &M, _rng: &mut R, _state: &Sample) -> Result<()> {
        Ok(())
    }

    fn save_sampler_specific(&mut self, _sampler: &S) -> Result<()> {
        Ok(())
    }

    fn save_rng(&mut self, _rng: &R) -> Result<()> {
        Ok(())
    }
}

/// In-process blob store, for driver loops that hand a chain from the
/// warmup call to the sampling call without touching disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpoint {
    sampler_state: Option<Vec<u8>>,
    rng_state: Option<Vec<u8>>,
    inits: Option<Vec<f64>>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// The initial-values snapshot from the last completed run, if any.
    pub fn inits(&self) -> Option<&[f64]> {
        self.inits.as_deref()
    }
}

impl<S: Resumable, R: Resumable, M> CheckpointStore<S, R, M> for MemoryCheckpoint {
    fn load_sampler_specific(&mut self, sampler: &mut S) -> Result<()> {
        match &self.sampler_state {
            Some(state) => sampler.restore_state(state),
            None => Ok(()),
        }
    }

    fn load_rng(&mut self, rng: &mut R) -> Result<()> {
        match &self.rng_state {
            Some(state) => rng.restore_state(state),
            None => Ok(()),
        }
    }

    fn save_inits(&mut self, _model: &M, _rng: &mut R, state: &Sample) -> Result<()> {
        self.inits = Some(state.params.clone());
        Ok(())
    }

    fn save_sampler_specific(&mut self, sampler: &S) -> Result<()> {
        self.sampler_state = Some(sampler.save_state());
        Ok(())
    }

    fn save_rng(&mut self, rng: &R) -> Result<()> {
        self.rng_state = Some(rng.save_state());
        Ok(())
    }
}

/// Blob-per-file store under one directory, for resuming across processes.
///
/// The adaptation and rng blobs are written verbatim; initial values are one
/// parameter per line, which round-trips exactly through `f64` formatting.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    dir: PathBuf,
}

impl FileCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileCheckpoint { dir: dir.into() }
    }

    fn sampler_path(&self) -> PathBuf {
        self.dir.join("sampler.state")
    }

    fn rng_path(&self) -> PathBuf {
        self.dir.join("rng.state")
    }

    fn inits_path(&self) -> PathBuf {
        self.dir.join("inits.txt")
    }

    /// Reads back the initial-values snapshot, if one has been written.
    pub fn load_inits(&self) -> Result<Option<Vec<f64>>> {
        let path = self.inits_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let values = text
            .lines()
            .map(|line| {
                line.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid value {line:?} in {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(values))
    }

    fn write_blob(&self, path: PathBuf, blob: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        fs::write(&path, blob).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn restore_from(&self, path: PathBuf, target: &mut impl Resumable) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let blob =
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        target.restore_state(&blob)
    }
}

impl<S: Resumable, R: Resumable, M> CheckpointStore<S, R, M> for FileCheckpoint {
    fn load_sampler_specific(&mut self, sampler: &mut S) -> Result<()> {
        self.restore_from(self.sampler_path(), sampler)
    }

    fn load_rng(&mut self, rng: &mut R) -> Result<()> {
        self.restore_from(self.rng_path(), rng)
    }

    fn save_inits(&mut self, _model: &M, _rng: &mut R, state: &Sample) -> Result<()> {
        let text = state.params.iter().map(|v| v.to_string()).join("\n");
        self.write_blob(self.inits_path(), text.as_bytes())
    }

    fn save_sampler_specific(&mut self, sampler: &S) -> Result<()> {
        self.write_blob(self.sampler_path(), &sampler.save_state())
    }

    fn save_rng(&mut self, rng: &R) -> Result<()> {
        self.write_blob(self.rng_path(), &rng.save_state())
    }
}
