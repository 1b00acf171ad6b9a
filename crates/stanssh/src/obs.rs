//! Structured observability hooks for the session lifecycle.
//!
//! Events are emitted at `info!` level. For JSON output configure
//! `tracing-subscriber` with its json formatter.

use tracing::info;

/// RAII guard that enters a session-scoped tracing span.
///
/// While held, every tracing call carries the session id.
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    pub fn enter(session_id: &str) -> Self {
        let span = tracing::info_span!("stanssh.session", session_id = %session_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: model source loaded (local, no network).
pub fn emit_source_loaded(session_id: &str, model_name: &str, digest: &str) {
    info!(
        event = "session.source_loaded",
        session_id = %session_id,
        model_name = %model_name,
        digest = %digest,
    );
}

/// Emit event: remote compile finished.
pub fn emit_compiled(session_id: &str, digest: &str, duration_ms: u64, reused: bool) {
    info!(
        event = "session.compiled",
        session_id = %session_id,
        digest = %digest,
        duration_ms = duration_ms,
        reused = reused,
    );
}

/// Emit event: remote run finished.
pub fn emit_run_finished(session_id: &str, algorithm: &str, chains: usize, duration_ms: u64) {
    info!(
        event = "session.run_finished",
        session_id = %session_id,
        algorithm = %algorithm,
        chains = chains,
        duration_ms = duration_ms,
    );
}

/// Emit event: session entered the failed state.
pub fn emit_failed(session_id: &str, stage: &str, reason: &str) {
    info!(
        event = "session.failed",
        session_id = %session_id,
        stage = %stage,
        reason = %reason,
    );
}

/// Emit event: remote workdir removed (or kept).
pub fn emit_cleanup(session_id: &str, removed: bool) {
    info!(event = "session.cleanup", session_id = %session_id, removed = removed);
}
