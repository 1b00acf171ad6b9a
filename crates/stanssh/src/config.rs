//! Session configuration and the remote working-directory layout.
//!
//! The original convenience scripts assumed an implicit working directory on
//! the host; here the caller passes an explicit `SessionConfig`, and every
//! session derives its own uuid-suffixed directory under `remote_root`, so
//! concurrent sessions to the same host under the same username never
//! collide.

use uuid::Uuid;

/// Caller-supplied configuration for a model session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory on the remote host under which session workdirs are created.
    pub remote_root: String,

    /// Prefix for the per-session workdir name.
    pub workdir_prefix: String,

    /// Leave remote artifacts in place on `cleanup()` (for debugging the
    /// remote side). Default false.
    pub keep_artifacts: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remote_root: "/tmp/stanssh".to_string(),
            workdir_prefix: "job".to_string(),
            keep_artifacts: false,
        }
    }
}

impl SessionConfig {
    pub fn with_remote_root(mut self, root: impl Into<String>) -> Self {
        self.remote_root = root.into();
        self
    }

    pub fn with_workdir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.workdir_prefix = prefix.into();
        self
    }

    pub fn keep_artifacts(mut self) -> Self {
        self.keep_artifacts = true;
        self
    }
}

/// Deterministic file naming inside one session's remote workdir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    workdir: String,
}

impl SessionLayout {
    pub fn new(config: &SessionConfig, session_id: Uuid) -> Self {
        let root = config.remote_root.trim_end_matches('/');
        Self {
            workdir: format!("{}/{}-{}", root, config.workdir_prefix, session_id),
        }
    }

    pub fn workdir(&self) -> &str {
        &self.workdir
    }

    pub fn model_file(&self) -> String {
        format!("{}/model.stan", self.workdir)
    }

    pub fn driver_file(&self) -> String {
        format!("{}/driver.py", self.workdir)
    }

    pub fn manifest_file(&self) -> String {
        format!("{}/manifest.json", self.workdir)
    }

    /// Input data always lands as a `.json` file.
    pub fn data_file(&self) -> String {
        format!("{}/data.json", self.workdir)
    }

    /// Per-chain initial conditions file (1-based chain index).
    pub fn init_file(&self, chain: usize) -> String {
        format!("{}/init_{}.json", self.workdir, chain)
    }

    pub fn output_file(&self) -> String {
        format!("{}/output.json", self.workdir)
    }

    /// Compiled-model artifact produced by the remote compile step.
    pub fn artifact_file(&self) -> String {
        format!("{}/model.bin", self.workdir)
    }
}
