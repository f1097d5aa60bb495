/*!
# Affine-Invariant Ensemble Sampler

This module implements the Goodman & Weare stretch move: a population of
walkers explores the target density, and each walker is updated by stretching
along the line to a randomly chosen walker from the complementary half of the
ensemble. The move needs nothing from the target beyond an unnormalized
log-density, which makes it a good fit for posteriors with hard exclusion
regions encoded as `-inf`.

## Overview

- **Target (`D`)**: any type implementing [`LogProb`]; evaluations must be
  pure, since proposals for half the ensemble are evaluated in parallel.
- **Walkers**: positions live in an `Array2<f64>` of shape
  `[n_walkers, dim]`; each sweep updates the two halves in turn so every
  proposal stretches toward an already-consistent complementary set.
- **Reproducibility**: `set_seed` re-seeds the internal RNG; two samplers
  with the same seed, target, and starting positions produce identical
  chains.

## Example

```rust
use cosi_mcmc::ensemble::{EnsembleSampler, LogProb};
use ndarray::Array2;

struct Standard2D;

impl LogProb for Standard2D {
    fn log_prob(&self, theta: &[f64]) -> f64 {
        -0.5 * theta.iter().map(|x| x * x).sum::<f64>()
    }
}

let start = Array2::from_shape_fn((8, 2), |(w, d)| 0.1 * (w + d) as f64);
let mut sampler = EnsembleSampler::new(Standard2D, start).set_seed(42);
let chain = sampler.run(100);
assert_eq!(chain.shape(), &[100, 8, 2]);
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{s, Array2, Array3};
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::VecDeque;

/// An unnormalized log-density over a continuous parameter vector.
///
/// Implementations encode excluded regions by returning
/// `f64::NEG_INFINITY`; a NaN return is treated as an always-rejected
/// proposal by the sampler, but callers that can distinguish the two should
/// treat NaN as a defect rather than an exclusion.
pub trait LogProb {
    fn log_prob(&self, theta: &[f64]) -> f64;
}

/// The stretch-move ensemble sampler.
///
/// Walker positions are owned by the sampler and advanced in place; `run`
/// records every step, so burn-in and thinning are left to whatever
/// post-processes the returned chain.
#[derive(Debug, Clone)]
pub struct EnsembleSampler<D> {
    /// The target density being sampled.
    pub target: D,
    positions: Array2<f64>,
    log_probs: Vec<f64>,
    stretch: f64,
    /// The random seed in effect.
    pub seed: u64,
    rng: SmallRng,
}

impl<D: LogProb + Sync> EnsembleSampler<D> {
    /// Creates a sampler from a target and an `[n_walkers, dim]` array of
    /// starting positions. Requires at least two walkers and one dimension;
    /// the stretch scale defaults to 2.
    pub fn new(target: D, initial_positions: Array2<f64>) -> Self {
        let (n_walkers, dim) = initial_positions.dim();
        assert!(n_walkers >= 2, "ensemble needs at least two walkers");
        assert!(dim >= 1, "ensemble needs at least one dimension");

        let log_probs = initial_positions
            .rows()
            .into_iter()
            .map(|row| target.log_prob(row.as_slice().expect("row is contiguous")))
            .collect();
        let seed = thread_rng().gen::<u64>();

        Self {
            target,
            positions: initial_positions,
            log_probs,
            stretch: 2.0,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Sets a new random seed, re-seeding the internal RNG.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Sets the stretch scale `a` of the proposal distribution.
    pub fn set_stretch(mut self, stretch: f64) -> Self {
        assert!(stretch > 1.0, "stretch scale must exceed 1");
        self.stretch = stretch;
        self
    }

    /// The current walker positions, shape `[n_walkers, dim]`.
    pub fn current_positions(&self) -> &Array2<f64> {
        &self.positions
    }

    /// Performs one stretch-move sweep over both ensemble halves and
    /// returns how many walkers accepted their proposal.
    ///
    /// For walker `x_k` with partner `x_j` drawn from the complementary
    /// half, the proposal is `y = x_j + z (x_k - x_j)` with
    /// `z = ((a - 1) u + 1)^2 / a`, accepted when
    /// `(d - 1) ln z + log p(y) - log p(x_k) > ln u'`.
    pub fn step(&mut self) -> usize {
        let (n_walkers, dim) = self.positions.dim();
        let half = n_walkers / 2;
        let mut accepted = 0;

        // The second half stretches toward the already-updated first half.
        for (start, end, comp_start, comp_end) in [(0, half, half, n_walkers), (half, n_walkers, 0, half)] {
            let set_size = end - start;
            let comp_size = comp_end - comp_start;

            let mut stretches = Vec::with_capacity(set_size);
            let mut partners = Vec::with_capacity(set_size);
            let mut uniforms = Vec::with_capacity(set_size);
            for _ in 0..set_size {
                let u: f64 = self.rng.gen();
                stretches.push(((self.stretch - 1.0) * u + 1.0).powi(2) / self.stretch);
                partners.push(comp_start + self.rng.gen_range(0..comp_size));
                uniforms.push(self.rng.gen::<f64>());
            }

            let proposals: Vec<Vec<f64>> = (0..set_size)
                .map(|k| {
                    let (walker, partner, z) = (start + k, partners[k], stretches[k]);
                    (0..dim)
                        .map(|d| {
                            let x = self.positions[[walker, d]];
                            let c = self.positions[[partner, d]];
                            c + z * (x - c)
                        })
                        .collect()
                })
                .collect();

            let proposal_lps: Vec<f64> = proposals
                .par_iter()
                .map(|candidate| self.target.log_prob(candidate))
                .collect();

            for k in 0..set_size {
                let walker = start + k;
                let log_accept = (dim as f64 - 1.0) * stretches[k].ln() + proposal_lps[k]
                    - self.log_probs[walker];
                // A NaN ratio compares false and rejects the proposal.
                if log_accept > uniforms[k].ln() {
                    for d in 0..dim {
                        self.positions[[walker, d]] = proposals[k][d];
                    }
                    self.log_probs[walker] = proposal_lps[k];
                    accepted += 1;
                }
            }
        }

        accepted
    }

    /// Runs the sampler for `n_steps` sweeps and collects every position in
    /// a chain of shape `[n_steps, n_walkers, dim]`.
    pub fn run(&mut self, n_steps: usize) -> Array3<f64> {
        let (n_walkers, dim) = self.positions.dim();
        let mut out = Array3::zeros((n_steps, n_walkers, dim));

        for i in 0..n_steps {
            self.step();
            out.slice_mut(s![i, .., ..]).assign(&self.positions);
        }

        out
    }

    /// Like [`run`](Self::run), but displays a progress bar with the
    /// acceptance fraction averaged over a sliding window of 100 sweeps.
    pub fn run_progress(&mut self, n_steps: usize) -> Array3<f64> {
        let (n_walkers, dim) = self.positions.dim();
        let mut out = Array3::zeros((n_steps, n_walkers, dim));

        let pb = ProgressBar::new(n_steps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:8} {bar:40.white} ETA {eta:3} | {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_prefix("Ensemble");

        let window_size = 100;
        let mut accept_window: VecDeque<f32> = VecDeque::with_capacity(window_size);

        for i in 0..n_steps {
            let accepted = self.step();
            out.slice_mut(s![i, .., ..]).assign(&self.positions);

            accept_window.push_front(accepted as f32 / n_walkers as f32);
            if accept_window.len() > window_size {
                accept_window.pop_back();
            }
            let avg_accept_rate: f32 =
                accept_window.iter().sum::<f32>() / accept_window.len() as f32;
            pb.set_message(format!("p(accept)≈{:.2}", avg_accept_rate));
            pb.inc(1);
        }
        pb.finish_with_message("Done!");

        out
    }
}
