//! The two supported modeling-package versions and their capability sets.
//!
//! `Legacy` wraps PyStan 2 (sampling, ADVI, optimization); `Current` wraps
//! PyStan 3, which only builds and samples. Capability gating happens here,
//! locally, so an unsupported request never reaches the network.

use serde::Serialize;

use crate::capability::Capability;
use crate::config::SessionLayout;
use crate::params::{Algorithm, RunParameters};

/// Driver scripts uploaded to the remote workdir; the remote command line
/// just invokes `python3 driver.py <compile|run> <workdir>`.
const PYSTAN2_DRIVER: &str = include_str!("drivers/pystan2.py");
const PYSTAN3_DRIVER: &str = include_str!("drivers/pystan3.py");

/// Which modeling-package major version the session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanBackend {
    /// PyStan 2: compile, sample, variational inference, optimization.
    Legacy,
    /// PyStan 3: compile and sample only.
    Current,
}

impl StanBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StanBackend::Legacy => "legacy",
            StanBackend::Current => "current",
        }
    }

    /// The full capability set of this backend version.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            StanBackend::Legacy => &[
                Capability::Compile,
                Capability::Sample,
                Capability::VariationalInference,
                Capability::Optimize,
            ],
            StanBackend::Current => &[Capability::Compile, Capability::Sample],
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// The driver script uploaded alongside the model source.
    pub fn driver_source(&self) -> &'static str {
        match self {
            StanBackend::Legacy => PYSTAN2_DRIVER,
            StanBackend::Current => PYSTAN3_DRIVER,
        }
    }

    /// Remote command that compiles the uploaded model.
    pub fn compile_command(&self, layout: &SessionLayout) -> String {
        format!("python3 {} compile {}", layout.driver_file(), layout.workdir())
    }

    /// Remote command that runs the requested algorithm against the
    /// compiled artifact.
    pub fn run_command(&self, layout: &SessionLayout) -> String {
        format!("python3 {} run {}", layout.driver_file(), layout.workdir())
    }
}

impl std::fmt::Display for StanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The manifest uploaded to the remote workdir; the driver script reads it
/// instead of taking everything on the command line. File entries are names
/// relative to the workdir.
#[derive(Debug, Serialize)]
pub struct RunManifest {
    pub model_name: String,
    pub model_file: String,
    pub artifact_file: String,
    pub data_file: String,
    pub output_file: String,
    pub init_files: Vec<String>,
    pub chains: usize,
    pub iter: usize,
    pub warmup: Option<usize>,
    pub seed: Option<u64>,
    pub algorithm: Algorithm,
}

impl RunManifest {
    /// Manifest for the compile step; run fields hold placeholder values
    /// until `for_run` overwrites the manifest before sampling.
    pub fn for_compile(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            model_file: "model.stan".to_string(),
            artifact_file: "model.bin".to_string(),
            data_file: "data.json".to_string(),
            output_file: "output.json".to_string(),
            init_files: Vec::new(),
            chains: 1,
            iter: 1,
            warmup: None,
            seed: None,
            algorithm: Algorithm::Sample,
        }
    }

    /// Manifest for a run with the given parameters.
    pub fn for_run(model_name: &str, params: &RunParameters) -> Self {
        let init_files = match &params.inits {
            Some(inits) => (1..=inits.len()).map(|i| format!("init_{i}.json")).collect(),
            None => Vec::new(),
        };
        Self {
            init_files,
            chains: params.chains,
            iter: params.iter,
            warmup: params.warmup,
            seed: params.seed,
            algorithm: params.algorithm,
            ..Self::for_compile(model_name)
        }
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}
