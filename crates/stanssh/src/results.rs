//! Deserialized output of a remote run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, StanError};
use crate::params::Algorithm;

/// Draws for one chain: parameter name → one value per retained iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDraws {
    pub chain: usize,
    pub draws: BTreeMap<String, Vec<f64>>,
}

/// Everything a remote run produced, fully deserialized.
///
/// Independent per run: sampling twice yields two of these and neither
/// aliases remote state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub algorithm: Algorithm,
    pub draws: Vec<ChainDraws>,
    pub diagnostics: BTreeMap<String, f64>,
    /// Present for optimization runs only.
    pub point_estimates: Option<BTreeMap<String, f64>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Wire shape of the remote `output.json` artifact.
#[derive(Debug, Deserialize)]
struct RawArtifact {
    #[serde(default)]
    chains: Vec<RawChain>,
    #[serde(default)]
    diagnostics: BTreeMap<String, f64>,
    #[serde(default)]
    point_estimates: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct RawChain {
    chain: usize,
    draws: BTreeMap<String, Vec<f64>>,
}

impl RunResult {
    /// Parse the downloaded artifact. Malformed or truncated bytes fail
    /// with `Deserialization`; a partial result is never returned.
    pub(crate) fn from_artifact(
        raw: &[u8],
        algorithm: Algorithm,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        let artifact: RawArtifact =
            serde_json::from_slice(raw).map_err(|e| StanError::Deserialization(e.to_string()))?;

        let mut draws = Vec::with_capacity(artifact.chains.len());
        for chain in artifact.chains {
            // Every parameter within a chain must have the same draw count.
            let mut lens = chain.draws.values().map(Vec::len);
            if let Some(first) = lens.next() {
                if lens.any(|l| l != first) {
                    return Err(StanError::Deserialization(format!(
                        "chain {} has ragged draw lengths",
                        chain.chain
                    )));
                }
            }
            draws.push(ChainDraws {
                chain: chain.chain,
                draws: chain.draws,
            });
        }

        if algorithm == Algorithm::Optimize && artifact.point_estimates.is_none() {
            return Err(StanError::Deserialization(
                "optimization artifact is missing point_estimates".to_string(),
            ));
        }

        Ok(Self {
            algorithm,
            draws,
            diagnostics: artifact.diagnostics,
            point_estimates: artifact.point_estimates,
            started_at,
            finished_at: Utc::now(),
        })
    }

    pub fn num_chains(&self) -> usize {
        self.draws.len()
    }

    /// Draws of one parameter across all chains, flattened in chain order.
    pub fn parameter(&self, name: &str) -> Option<Vec<f64>> {
        let mut all = Vec::new();
        let mut found = false;
        for chain in &self.draws {
            if let Some(values) = chain.draws.get(name) {
                found = true;
                all.extend_from_slice(values);
            }
        }
        found.then_some(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact_json() -> Vec<u8> {
        serde_json::json!({
            "algorithm": "sample",
            "chains": [
                {"chain": 1, "draws": {"mu": [0.1, 0.2], "lp__": [-4.0, -3.5]}},
                {"chain": 2, "draws": {"mu": [0.3, 0.4], "lp__": [-4.1, -3.2]}}
            ],
            "diagnostics": {"n_iter": 2.0},
            "point_estimates": null
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_parse_sampling_artifact() {
        let result =
            RunResult::from_artifact(&artifact_json(), Algorithm::Sample, Utc::now()).unwrap();
        assert_eq!(result.num_chains(), 2);
        assert_eq!(result.parameter("mu"), Some(vec![0.1, 0.2, 0.3, 0.4]));
        assert_eq!(result.parameter("nope"), None);
        assert_eq!(result.diagnostics.get("n_iter"), Some(&2.0));
    }

    #[test]
    fn test_truncated_artifact_is_deserialization_error() {
        let mut bytes = artifact_json();
        bytes.truncate(bytes.len() / 2);
        let err = RunResult::from_artifact(&bytes, Algorithm::Sample, Utc::now()).unwrap_err();
        assert!(matches!(err, StanError::Deserialization(_)));
    }

    #[test]
    fn test_ragged_chain_rejected() {
        let raw = serde_json::json!({
            "chains": [{"chain": 1, "draws": {"mu": [0.1, 0.2], "tau": [0.5]}}]
        })
        .to_string();
        let err = RunResult::from_artifact(raw.as_bytes(), Algorithm::Sample, Utc::now())
            .unwrap_err();
        match err {
            StanError::Deserialization(msg) => assert!(msg.contains("ragged")),
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }

    #[test]
    fn test_optimize_artifact_requires_point_estimates() {
        let raw = serde_json::json!({"chains": [], "diagnostics": {}}).to_string();
        let err = RunResult::from_artifact(raw.as_bytes(), Algorithm::Optimize, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StanError::Deserialization(_)));

        let raw = serde_json::json!({
            "chains": [],
            "point_estimates": {"mu": 1.25}
        })
        .to_string();
        let result =
            RunResult::from_artifact(raw.as_bytes(), Algorithm::Optimize, Utc::now()).unwrap();
        assert_eq!(
            result.point_estimates.as_ref().and_then(|p| p.get("mu")),
            Some(&1.25)
        );
    }
}
