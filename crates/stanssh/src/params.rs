//! Run parameters: chains, iterations, initial conditions, algorithm.

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::data::DataBundle;
use crate::error::ValidationError;

/// Which inference algorithm the remote run should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// MCMC sampling (the default, and the only thing every backend does).
    Sample,
    /// ADVI variational inference.
    VariationalInference,
    /// Posterior-mode point estimation.
    Optimize,
}

impl Algorithm {
    /// Capability a backend must declare to run this algorithm.
    pub fn required_capability(&self) -> Capability {
        match self {
            Algorithm::Sample => Capability::Sample,
            Algorithm::VariationalInference => Capability::VariationalInference,
            Algorithm::Optimize => Capability::Optimize,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Sample => write!(f, "sample"),
            Algorithm::VariationalInference => write!(f, "variational_inference"),
            Algorithm::Optimize => write!(f, "optimize"),
        }
    }
}

/// Caller-specified configuration for one remote run.
///
/// Validation is local and happens before anything touches the network, so
/// a bad parameter set never costs a remote round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    /// Number of chains.
    pub chains: usize,

    /// Iterations per chain (including warmup).
    pub iter: usize,

    /// Warmup iterations per chain; backend default when `None`.
    pub warmup: Option<usize>,

    /// RNG seed; remote-chosen when `None`.
    pub seed: Option<u64>,

    /// Per-chain initial conditions. When given, must have exactly one
    /// entry per chain.
    pub inits: Option<Vec<DataBundle>>,

    /// Requested algorithm.
    pub algorithm: Algorithm,
}

impl RunParameters {
    /// Sampling run with the given chain and iteration counts.
    pub fn sample(chains: usize, iter: usize) -> Self {
        Self {
            chains,
            iter,
            warmup: None,
            seed: None,
            inits: None,
            algorithm: Algorithm::Sample,
        }
    }

    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = Some(warmup);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_inits(mut self, inits: Vec<DataBundle>) -> Self {
        self.inits = Some(inits);
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Local validation; see `ValidationError` for the cases.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.chains == 0 {
            return Err(ValidationError::ZeroChains);
        }
        if self.iter == 0 {
            return Err(ValidationError::ZeroIterations);
        }
        if let Some(warmup) = self.warmup {
            if warmup >= self.iter {
                return Err(ValidationError::WarmupExceedsIterations {
                    warmup,
                    iter: self.iter,
                });
            }
        }
        if let Some(inits) = &self.inits {
            if inits.len() != self.chains {
                return Err(ValidationError::InitCountMismatch {
                    chains: self.chains,
                    inits: inits.len(),
                });
            }
        }
        Ok(())
    }
}
