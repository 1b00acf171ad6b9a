//! Backend capabilities — what a bound modeling-package version can do.
//!
//! Dispatch is always by capability check, never by inspecting the backend
//! type: a session asks "does my backend support optimize?" before building
//! any remote command.

use serde::{Deserialize, Serialize};

/// An operation a Stan backend may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Compile,
    Sample,
    VariationalInference,
    Optimize,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Compile => write!(f, "compile"),
            Capability::Sample => write!(f, "sample"),
            Capability::VariationalInference => write!(f, "variational_inference"),
            Capability::Optimize => write!(f, "optimize"),
        }
    }
}
