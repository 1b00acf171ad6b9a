//! End-to-end session lifecycle against the scripted in-memory shell.

use stanssh::transport::fakes::ScriptedShell;
use stanssh::transport::TransportError;
use stanssh::{
    Algorithm, DataBundle, ModelSession, RunParameters, SessionState, StanBackend, StanError,
    ValidationError,
};

const MODEL: &str = "parameters { real mu; } model { mu ~ normal(0, 1); }";

fn artifact(mu_per_chain: &[&[f64]]) -> Vec<u8> {
    let chains: Vec<_> = mu_per_chain
        .iter()
        .enumerate()
        .map(|(i, mu)| {
            serde_json::json!({"chain": i + 1, "draws": {"mu": mu}})
        })
        .collect();
    serde_json::json!({
        "algorithm": "sample",
        "chains": chains,
        "diagnostics": {},
        "point_estimates": null
    })
    .to_string()
    .into_bytes()
}

/// Build a session that has already compiled successfully.
async fn compiled_session(backend: StanBackend) -> ModelSession<ScriptedShell> {
    let mut session = ModelSession::new(ScriptedShell::new(), backend);
    session.load_source_str("unit_normal", MODEL).unwrap();
    session.shell().push_ok();
    session.compile().await.expect("compile failed");
    session
}

fn small_data() -> DataBundle {
    let mut data = DataBundle::new();
    data.insert("N", 1i64);
    data
}

/// Test: mismatched init count fails locally, zero shell invocations.
#[tokio::test]
async fn test_init_mismatch_fails_before_any_network_call() {
    let mut session = compiled_session(StanBackend::Current).await;
    let calls_after_compile = session.shell().call_count();

    let mut init = DataBundle::new();
    init.insert("mu", 0.0f64);
    let params = RunParameters::sample(4, 1000).with_inits(vec![init]);

    let err = session.sample(&small_data(), &params).await.unwrap_err();
    match err {
        StanError::Validation(ValidationError::InitCountMismatch { chains, inits }) => {
            assert_eq!((chains, inits), (4, 1));
        }
        other => panic!("expected InitCountMismatch, got {other:?}"),
    }
    assert_eq!(
        session.shell().call_count(),
        calls_after_compile,
        "validation failure must not touch the shell"
    );
}

/// Test: optimization on the current backend is refused locally.
#[tokio::test]
async fn test_optimize_unsupported_on_current_backend() {
    let mut session = compiled_session(StanBackend::Current).await;
    let calls_after_compile = session.shell().call_count();

    let err = session.optimize(&small_data(), 2000).await.unwrap_err();
    assert!(matches!(err, StanError::Unsupported { .. }));
    assert_eq!(session.shell().call_count(), calls_after_compile);

    let err = session.variational(&small_data(), 2000).await.unwrap_err();
    assert!(matches!(err, StanError::Unsupported { .. }));
    assert_eq!(session.shell().call_count(), calls_after_compile);
}

/// Test: the legacy backend accepts the same optimization request.
#[tokio::test]
async fn test_optimize_supported_on_legacy_backend() {
    let mut session = compiled_session(StanBackend::Legacy).await;

    let output = format!("{}/output.json", session.workdir());
    session.shell().put_remote_file(
        &output,
        serde_json::json!({"chains": [], "point_estimates": {"mu": 0.01}})
            .to_string()
            .as_bytes(),
    );
    session.shell().push_ok();

    let result = session.optimize(&small_data(), 2000).await.unwrap();
    assert_eq!(result.algorithm, Algorithm::Optimize);
    assert_eq!(
        result.point_estimates.as_ref().and_then(|p| p.get("mu")),
        Some(&0.01)
    );
}

/// Test: two successful samples, independent results, still `Compiled`.
#[tokio::test]
async fn test_sampling_twice_keeps_session_compiled() {
    let mut session = compiled_session(StanBackend::Current).await;
    let output = format!("{}/output.json", session.workdir());

    session
        .shell()
        .put_remote_file(&output, &artifact(&[&[0.1, 0.2], &[0.3, 0.4]]));
    session.shell().push_ok();
    let first = session
        .sample(&small_data(), &RunParameters::sample(2, 100))
        .await
        .unwrap();
    assert_eq!(*session.state(), SessionState::Compiled);

    session
        .shell()
        .put_remote_file(&output, &artifact(&[&[9.9]]));
    session.shell().push_ok();
    let second = session
        .sample(&small_data(), &RunParameters::sample(1, 50).with_seed(42))
        .await
        .unwrap();
    assert_eq!(*session.state(), SessionState::Compiled);

    assert_eq!(first.num_chains(), 2);
    assert_eq!(second.num_chains(), 1);
    assert_eq!(first.parameter("mu"), Some(vec![0.1, 0.2, 0.3, 0.4]));
    assert_eq!(second.parameter("mu"), Some(vec![9.9]));
}

/// Test: remote compile failure surfaces stderr verbatim and parks the
/// session in `Failed`; sampling afterwards is a state error, not a no-op.
#[tokio::test]
async fn test_compile_failure_preserves_stderr_and_blocks_sampling() {
    let mut session = ModelSession::new(ScriptedShell::new(), StanBackend::Current);
    session.load_source_str("broken", "parameters { real mu").unwrap();
    session.shell().push_output(1, "", "syntax error");

    let err = session.compile().await.unwrap_err();
    match &err {
        StanError::Transport(TransportError::RemoteExecution {
            exit_code, stderr, ..
        }) => {
            assert_eq!(*exit_code, 1);
            assert_eq!(stderr, "syntax error");
        }
        other => panic!("expected RemoteExecution, got {other:?}"),
    }
    assert!(err.to_string().contains("syntax error"));
    assert!(matches!(
        session.state(),
        SessionState::Failed { stage: "compile", .. }
    ));

    let calls = session.shell().call_count();
    let err = session
        .sample(&small_data(), &RunParameters::sample(2, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, StanError::InvalidState { .. }));
    assert_eq!(session.shell().call_count(), calls);
}

/// Test: a truncated result artifact fails deserialization, never a
/// partial run result.
#[tokio::test]
async fn test_truncated_result_artifact_is_deserialization_error() {
    let mut session = compiled_session(StanBackend::Current).await;
    let output = format!("{}/output.json", session.workdir());

    let mut bytes = artifact(&[&[0.1, 0.2]]);
    bytes.truncate(bytes.len() / 2);
    session.shell().put_remote_file(&output, &bytes);
    session.shell().push_ok();

    let err = session
        .sample(&small_data(), &RunParameters::sample(1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, StanError::Deserialization(_)));
}

/// Test: a run whose remote process never wrote output surfaces the
/// missing download as a transfer error.
#[tokio::test]
async fn test_missing_output_artifact_is_transfer_error() {
    let mut session = compiled_session(StanBackend::Current).await;
    session.shell().push_ok(); // run command "succeeds" but writes nothing

    let err = session
        .sample(&small_data(), &RunParameters::sample(1, 100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StanError::Transport(TransportError::Transfer { .. })
    ));
}

/// Test: uploaded data and per-chain init files land in the session
/// workdir with forced `.json` names.
#[tokio::test]
async fn test_sample_uploads_data_and_inits_as_json() {
    let mut session = compiled_session(StanBackend::Current).await;
    let workdir = session.workdir().to_string();
    let output = format!("{workdir}/output.json");
    session.shell().put_remote_file(&output, &artifact(&[&[0.5]]));
    session.shell().push_ok();

    let mut init = DataBundle::new();
    init.insert("mu", 0.25f64);
    let params = RunParameters::sample(1, 100).with_inits(vec![init]);
    session.sample(&small_data(), &params).await.unwrap();

    let data = session
        .shell()
        .remote_file(&format!("{workdir}/data.json"))
        .expect("data.json not uploaded");
    let parsed: serde_json::Value = serde_json::from_slice(&data).unwrap();
    assert_eq!(parsed["N"], 1);

    let init = session
        .shell()
        .remote_file(&format!("{workdir}/init_1.json"))
        .expect("init_1.json not uploaded");
    let parsed: serde_json::Value = serde_json::from_slice(&init).unwrap();
    assert_eq!(parsed["mu"], 0.25);
}

/// Test: cleanup removes the remote workdir unless artifacts are kept.
#[tokio::test]
async fn test_cleanup_removes_workdir() {
    let mut session = compiled_session(StanBackend::Current).await;
    session.shell().push_ok();
    session.cleanup().await.unwrap();

    let commands = session.shell().commands();
    let last = commands.last().unwrap();
    assert!(last.starts_with("rm -rf "));
    assert!(last.contains(session.workdir()));
}

#[tokio::test]
async fn test_cleanup_keeps_artifacts_when_configured() {
    let config = stanssh::SessionConfig::default().keep_artifacts();
    let mut session =
        ModelSession::with_config(ScriptedShell::new(), StanBackend::Current, config);
    session.load_source_str("m", MODEL).unwrap();
    session.shell().push_ok();
    session.compile().await.unwrap();
    let calls = session.shell().call_count();

    session.cleanup().await.unwrap();
    assert_eq!(session.shell().call_count(), calls, "no rm command issued");
}
