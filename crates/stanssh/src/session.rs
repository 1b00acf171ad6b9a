//! The model session: one compiled model, one remote endpoint, repeated runs.
//!
//! Lifecycle: `Uninitialized → SourceLoaded → Compiled`, then any number of
//! runs, each returning the session to `Compiled`. A failed remote compile
//! or run parks the session in `Failed`; the caller restarts from
//! `recompile()` or builds a new session. Loading a different model always
//! means a new session — source is immutable once loaded.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use stanssh_transport::{RemoteShell, TransportError};

use crate::backend::{RunManifest, StanBackend};
use crate::config::{SessionConfig, SessionLayout};
use crate::data::DataBundle;
use crate::error::{Result, StanError};
use crate::obs;
use crate::params::{Algorithm, RunParameters};
use crate::results::RunResult;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    SourceLoaded,
    Compiled,
    Failed { stage: &'static str, reason: String },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::SourceLoaded => write!(f, "source_loaded"),
            SessionState::Compiled => write!(f, "compiled"),
            SessionState::Failed { stage, .. } => write!(f, "failed({stage})"),
        }
    }
}

#[derive(Debug, Clone)]
struct ModelSource {
    name: String,
    text: String,
    /// sha256 of the source text — the compiled-model identifier used to
    /// skip recompilation.
    digest: String,
}

/// A Stan model bound to one remote shell and one backend version.
pub struct ModelSession<S: RemoteShell> {
    shell: S,
    backend: StanBackend,
    config: SessionConfig,
    layout: SessionLayout,
    session_id: Uuid,
    state: SessionState,
    source: Option<ModelSource>,
    compiled_digest: Option<String>,
}

impl<S: RemoteShell> ModelSession<S> {
    /// Session with the default configuration.
    pub fn new(shell: S, backend: StanBackend) -> Self {
        Self::with_config(shell, backend, SessionConfig::default())
    }

    pub fn with_config(shell: S, backend: StanBackend, config: SessionConfig) -> Self {
        let session_id = Uuid::new_v4();
        let layout = SessionLayout::new(&config, session_id);
        Self {
            shell,
            backend,
            config,
            layout,
            session_id,
            state: SessionState::Uninitialized,
            source: None,
            compiled_digest: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn backend(&self) -> StanBackend {
        self.backend
    }

    /// The session's remote working directory.
    pub fn workdir(&self) -> &str {
        self.layout.workdir()
    }

    /// The underlying shell (useful for call assertions in tests).
    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// Digest of the source recorded at load time, once loaded.
    pub fn source_digest(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.digest.as_str())
    }

    /// Supply model source text. Local only, no network I/O.
    pub fn load_source_str(&mut self, name: impl Into<String>, text: impl Into<String>) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(self.state_error("uninitialized"));
        }
        let name = name.into();
        let text = text.into();
        let _span = obs::SessionSpan::enter(&self.session_id.to_string());

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hex::encode(hasher.finalize());

        obs::emit_source_loaded(&self.session_id.to_string(), &name, &digest);
        self.source = Some(ModelSource { name, text, digest });
        self.state = SessionState::SourceLoaded;
        Ok(())
    }

    /// Supply model source from a local `.stan` file. Local only.
    pub fn load_source_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        self.load_source_str(name, text)
    }

    /// Upload the model and compile it remotely.
    ///
    /// Idempotent per source: calling `compile` again on an already-compiled
    /// session is a local no-op. A remote failure parks the session in
    /// `Failed` with the remote stderr captured.
    pub async fn compile(&mut self) -> Result<()> {
        match &self.state {
            SessionState::SourceLoaded => {}
            SessionState::Compiled => {
                let source = self.source_ref()?;
                if self.compiled_digest.as_deref() == Some(source.digest.as_str()) {
                    obs::emit_compiled(&self.session_id.to_string(), &source.digest, 0, true);
                    return Ok(());
                }
            }
            _ => return Err(self.state_error("source_loaded")),
        }

        let source = self.source_ref()?.clone();
        let start = std::time::Instant::now();

        let manifest = RunManifest::for_compile(&source.name)
            .to_json_bytes()
            .map_err(|e| StanError::Serialization {
                name: "manifest".to_string(),
                reason: e.to_string(),
            })?;

        let steps = async {
            self.shell.mkdir_all(self.layout.workdir()).await?;
            self.shell
                .upload_bytes(source.text.as_bytes(), &self.layout.model_file())
                .await?;
            self.shell
                .upload_bytes(
                    self.backend.driver_source().as_bytes(),
                    &self.layout.driver_file(),
                )
                .await?;
            self.shell
                .upload_bytes(&manifest, &self.layout.manifest_file())
                .await?;
            self.shell
                .run(&self.backend.compile_command(&self.layout))
                .await?;
            Ok::<(), TransportError>(())
        };
        if let Err(err) = steps.await {
            return Err(self.fail("compile", err));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        obs::emit_compiled(&self.session_id.to_string(), &source.digest, duration_ms, false);
        self.compiled_digest = Some(source.digest);
        self.state = SessionState::Compiled;
        Ok(())
    }

    /// Drop the compiled artifact association and compile again.
    ///
    /// The explicit transition for re-running compilation on the same
    /// session, e.g. after the remote toolchain changed underneath it.
    pub async fn recompile(&mut self) -> Result<()> {
        if self.source.is_none() {
            return Err(self.state_error("source_loaded"));
        }
        self.compiled_digest = None;
        self.state = SessionState::SourceLoaded;
        self.compile().await
    }

    /// Run the requested algorithm against the compiled model.
    ///
    /// Capability and parameter checks are local and happen before anything
    /// touches the network. On success the session stays `Compiled`, so the
    /// caller can sample again with different parameters.
    pub async fn sample(&mut self, data: &DataBundle, params: &RunParameters) -> Result<RunResult> {
        let capability = params.algorithm.required_capability();
        if !self.backend.supports(capability) {
            return Err(StanError::Unsupported {
                backend: self.backend.name(),
                capability,
            });
        }
        params.validate()?;
        if self.state != SessionState::Compiled {
            return Err(self.state_error("compiled"));
        }

        let source = self.source_ref()?.clone();
        let data_bytes = data.to_json_bytes()?;
        let mut init_bytes = Vec::new();
        if let Some(inits) = &params.inits {
            for init in inits {
                init_bytes.push(init.to_json_bytes()?);
            }
        }
        let manifest = RunManifest::for_run(&source.name, params)
            .to_json_bytes()
            .map_err(|e| StanError::Serialization {
                name: "manifest".to_string(),
                reason: e.to_string(),
            })?;

        let started_at = chrono::Utc::now();
        let start = std::time::Instant::now();

        let layout = &self.layout;
        let shell = &self.shell;
        let backend = self.backend;
        let steps = async {
            shell.upload_bytes(&data_bytes, &layout.data_file()).await?;
            for (i, bytes) in init_bytes.iter().enumerate() {
                shell.upload_bytes(bytes, &layout.init_file(i + 1)).await?;
            }
            shell.upload_bytes(&manifest, &layout.manifest_file()).await?;
            shell.run(&backend.run_command(layout)).await?;
            shell.download_bytes(&layout.output_file()).await
        };
        let raw = match steps.await {
            Ok(raw) => raw,
            Err(err) => return Err(self.fail("sample", err)),
        };

        let result = match RunResult::from_artifact(&raw, params.algorithm, started_at) {
            Ok(result) => result,
            Err(err) => {
                let reason = err.to_string();
                obs::emit_failed(&self.session_id.to_string(), "sample", &reason);
                self.state = SessionState::Failed {
                    stage: "sample",
                    reason,
                };
                return Err(err);
            }
        };

        obs::emit_run_finished(
            &self.session_id.to_string(),
            &params.algorithm.to_string(),
            params.chains,
            start.elapsed().as_millis() as u64,
        );
        Ok(result)
    }

    /// Point estimation. Legacy backend only.
    pub async fn optimize(&mut self, data: &DataBundle, iter: usize) -> Result<RunResult> {
        let params = RunParameters::sample(1, iter).with_algorithm(Algorithm::Optimize);
        self.sample(data, &params).await
    }

    /// ADVI variational inference. Legacy backend only.
    pub async fn variational(&mut self, data: &DataBundle, iter: usize) -> Result<RunResult> {
        let params = RunParameters::sample(1, iter).with_algorithm(Algorithm::VariationalInference);
        self.sample(data, &params).await
    }

    /// Remove the remote workdir, unless the config keeps artifacts.
    pub async fn cleanup(&mut self) -> Result<()> {
        if self.config.keep_artifacts {
            obs::emit_cleanup(&self.session_id.to_string(), false);
            return Ok(());
        }
        self.shell
            .run(&format!("rm -rf {}", self.layout.workdir()))
            .await?;
        obs::emit_cleanup(&self.session_id.to_string(), true);
        Ok(())
    }

    /// Release the underlying connection.
    pub async fn close(&self) -> Result<()> {
        self.shell.close().await?;
        Ok(())
    }

    fn source_ref(&self) -> Result<&ModelSource> {
        self.source.as_ref().ok_or(StanError::InvalidState {
            expected: "source_loaded",
            actual: SessionState::Uninitialized.to_string(),
        })
    }

    fn state_error(&self, expected: &'static str) -> StanError {
        StanError::InvalidState {
            expected,
            actual: self.state.to_string(),
        }
    }

    fn fail(&mut self, stage: &'static str, err: TransportError) -> StanError {
        let reason = err.to_string();
        obs::emit_failed(&self.session_id.to_string(), stage, &reason);
        self.state = SessionState::Failed { stage, reason };
        StanError::Transport(err)
    }
}
