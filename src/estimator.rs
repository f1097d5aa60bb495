//! Walker initialization, sampler delegation, and posterior extraction for
//! the inclination fit.

use ndarray::{s, Array1, Array2, Array3};
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use thiserror::Error;

use crate::ensemble::EnsembleSampler;
use crate::model::CosiModel;
use crate::observation::Observation;

/// Dimensionality of `theta = [cosi, rstar_fit, prot_fit]`.
const NDIM: usize = 3;

/// Candidate-draw budget for walker initialization.
const MAX_INIT_ATTEMPTS: usize = 1000;

/// Chains shorter than this use a fractional burn-in of a third of the
/// chain instead of the caller-requested value.
const SHORT_CHAIN_STEPS: usize = 1500;

/// Default burn-in for [`extract_posterior`].
pub const DEFAULT_BURNIN: usize = 500;

/// Default perturbation scale for [`WalkerInit`].
pub const DEFAULT_PERTURBATION: f64 = 0.02;

/// Errors produced while initializing walkers or post-processing a chain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// The ensemble needs a minimum number of walkers per parameter for the
    /// stretch move to mix.
    #[error("walker count must be at least {minimum}; got {requested}")]
    TooFewWalkers { requested: usize, minimum: usize },

    /// The candidate-draw budget ran out before enough finite-probability
    /// positions were found. The base position or perturbation places the
    /// ensemble in an implausible region; adjust and retry.
    #[error(
        "collected {accepted} of {requested} finite-probability walkers \
         after {attempts} draws"
    )]
    InitializationExhausted {
        requested: usize,
        accepted: usize,
        attempts: usize,
    },

    /// Thinning by zero would retain nothing.
    #[error("thinning interval must be positive")]
    InvalidThinning,

    /// A log-probability evaluation returned NaN. Unlike `-inf`, which
    /// marks a region the model excludes, NaN means the computation itself
    /// broke.
    #[error("log-probability evaluated to NaN at theta = {theta:?}")]
    NumericAnomaly { theta: [f64; 3] },

    /// The chain holds no samples.
    #[error("chain is empty")]
    EmptyChain,
}

/// Where the walker cloud starts.
///
/// With `base: None` the walkers scatter around the midpoint inclination
/// and the observed radius and period, `[0.5, rstar, prot]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkerInit {
    pub base: Option<[f64; 3]>,
    pub perturbation: f64,
}

impl Default for WalkerInit {
    fn default() -> Self {
        Self {
            base: None,
            perturbation: DEFAULT_PERTURBATION,
        }
    }
}

/**
Runs the inclination fit: owns the probability model, seeds and launches the
ensemble sampler, and post-processes the raw chain.

# Examples

```rust
use cosi_mcmc::estimator::{extract_posterior, CosiEstimator, WalkerInit};
use cosi_mcmc::observation::Observation;

let obs = Observation::new(7.3, 0.3, 0.912, 0.034, 6.45, 0.05).unwrap();
let estimator = CosiEstimator::new(obs).set_seed(42);

let chain = estimator.run(12, 300, &WalkerInit::default(), false).unwrap();
let cosi = extract_posterior(&chain, 500, 1).unwrap();

// A 300-step chain falls back to a fractional burn-in of 100 steps.
assert_eq!(cosi.len(), (300 - 100) * 12);
assert!(cosi.iter().all(|c| (0.0..=1.0).contains(c)));
```
*/
#[derive(Debug, Clone)]
pub struct CosiEstimator {
    model: CosiModel,
    seed: u64,
}

impl CosiEstimator {
    pub fn new(observation: Observation) -> Self {
        Self {
            model: CosiModel::new(observation),
            seed: thread_rng().gen::<u64>(),
        }
    }

    /// Sets the seed used for walker initialization and the sampler,
    /// making [`run`](Self::run) fully reproducible.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn model(&self) -> &CosiModel {
        &self.model
    }

    /// Draws `n_walkers` starting positions around the base position,
    /// keeping only candidates with finite log-probability.
    ///
    /// Candidates are `base + perturbation * N(0, 1)^3`. Draws continue
    /// until `n_walkers` positions are accepted or a budget of 1000 draws
    /// is exhausted, which fails with
    /// [`EstimationError::InitializationExhausted`]. A NaN log-probability
    /// fails immediately with [`EstimationError::NumericAnomaly`].
    pub fn initialize_walkers(
        &self,
        n_walkers: usize,
        init: &WalkerInit,
    ) -> Result<Vec<[f64; 3]>, EstimationError> {
        let obs = self.model.observation();
        let base = init.base.unwrap_or([0.5, obs.rstar, obs.prot]);

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut accepted = Vec::with_capacity(n_walkers);
        let mut attempts = 0;

        while accepted.len() < n_walkers && attempts < MAX_INIT_ATTEMPTS {
            attempts += 1;
            let mut candidate = [0.0; NDIM];
            for (slot, center) in candidate.iter_mut().zip(base) {
                let eps: f64 = rng.sample(StandardNormal);
                *slot = center + init.perturbation * eps;
            }

            let lp = self.model.log_probability(&candidate);
            if lp.is_nan() {
                return Err(EstimationError::NumericAnomaly { theta: candidate });
            }
            if lp.is_finite() {
                accepted.push(candidate);
            }
        }

        if accepted.len() < n_walkers {
            return Err(EstimationError::InitializationExhausted {
                requested: n_walkers,
                accepted: accepted.len(),
                attempts,
            });
        }
        Ok(accepted)
    }

    /// Initializes the walkers and advances the ensemble for `n_steps`
    /// sweeps, returning the raw chain of shape `[n_steps, n_walkers, 3]`.
    ///
    /// `show_progress` selects between the sampler's plain and
    /// progress-reporting run loops.
    pub fn run(
        &self,
        n_walkers: usize,
        n_steps: usize,
        init: &WalkerInit,
        show_progress: bool,
    ) -> Result<Array3<f64>, EstimationError> {
        if n_walkers < 2 * NDIM {
            return Err(EstimationError::TooFewWalkers {
                requested: n_walkers,
                minimum: 2 * NDIM,
            });
        }

        let walkers = self.initialize_walkers(n_walkers, init)?;
        let positions = Array2::from_shape_fn((n_walkers, NDIM), |(w, d)| walkers[w][d]);

        let mut sampler =
            EnsembleSampler::new(self.model, positions).set_seed(self.seed.wrapping_add(1));
        let chain = if show_progress {
            sampler.run_progress(n_steps)
        } else {
            sampler.run(n_steps)
        };
        Ok(chain)
    }

    /// Returns the highest-posterior sample in the chain.
    ///
    /// Every flattened sample is evaluated through the model; any NaN
    /// log-probability is a hard [`EstimationError::NumericAnomaly`], while
    /// `-inf` samples are merely never selected.
    pub fn max_probability(&self, chain: &Array3<f64>) -> Result<[f64; 3], EstimationError> {
        let n_samples = chain.shape()[0] * chain.shape()[1];
        if n_samples == 0 {
            return Err(EstimationError::EmptyChain);
        }

        let flat = chain
            .to_shape((n_samples, NDIM))
            .expect("chain has shape [step, walker, 3]");
        let samples: Vec<[f64; 3]> = flat
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();
        let log_probs: Vec<f64> = samples
            .par_iter()
            .map(|theta| self.model.log_probability(theta))
            .collect();

        let mut best = 0;
        let mut best_lp = f64::NEG_INFINITY;
        for (i, &lp) in log_probs.iter().enumerate() {
            if lp.is_nan() {
                return Err(EstimationError::NumericAnomaly { theta: samples[i] });
            }
            if lp > best_lp {
                best_lp = lp;
                best = i;
            }
        }
        Ok(samples[best])
    }
}

/// Flattens a chain across walkers (preserving step order), discards
/// burn-in, thins, and returns the `cosi` coordinate of what remains.
///
/// Chains shorter than 1500 steps replace the requested `burn_in` with a
/// third of the chain length; a flat default could otherwise swallow a
/// short chain whole. A chain with fewer than 3 steps, or a burn-in at or
/// past the chain length, yields an empty sample rather than an error.
pub fn extract_posterior(
    chain: &Array3<f64>,
    burn_in: usize,
    thin: usize,
) -> Result<Array1<f64>, EstimationError> {
    if thin == 0 {
        return Err(EstimationError::InvalidThinning);
    }

    let total_steps = chain.shape()[0];
    let burn_in = if total_steps < SHORT_CHAIN_STEPS {
        total_steps / 3
    } else {
        burn_in
    };
    if total_steps < 3 || burn_in >= total_steps {
        return Ok(Array1::zeros(0));
    }

    let cosi = chain.slice(s![burn_in.., .., 0]);
    Ok(cosi.iter().copied().step_by(thin).collect())
}
