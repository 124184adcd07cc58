use std::collections::HashSet;
use std::num::NonZeroUsize;

use libafl_bolts::rands::{Rand, StdRand};

/// Dedup set + insertion-ordered pool of inputs. Grows monotonically; the
/// core never evicts (noted as future work in `DESIGN.md`).
#[derive(Debug, Default)]
pub struct CorpusManager {
    inputs: Vec<Vec<i64>>,
    seen: HashSet<Vec<i64>>,
}

impl CorpusManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts only if not already present. Returns whether it was new.
    pub fn add(&mut self, input: Vec<i64>) -> bool {
        if self.seen.insert(input.clone()) {
            self.inputs.push(input);
            true
        } else {
            false
        }
    }

    /// Uniform random selection over the insertion-order sequence.
    /// `None` when empty, rather than a panic on caller error that's
    /// trivially preventable.
    pub fn pick(&self, rng: &mut StdRand) -> Option<&[i64]> {
        let len = NonZeroUsize::new(self.inputs.len())?;
        let idx = rng.below(len);
        Some(&self.inputs[idx])
    }

    pub fn size(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
