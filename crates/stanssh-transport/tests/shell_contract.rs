//! Contract tests for `RemoteShell`, run against the in-memory fake.

use std::sync::Arc;

use stanssh_transport::fakes::ScriptedShell;
use stanssh_transport::{RemoteShell, TransportError};

/// Test: the trait is object-safe and usable through `Arc<dyn RemoteShell>`.
#[tokio::test]
async fn test_trait_object_roundtrip() {
    let shell: Arc<dyn RemoteShell> = Arc::new(ScriptedShell::new());

    shell.mkdir_all("/tmp/job").await.unwrap();
    shell.upload_bytes(b"{}", "/tmp/job/data.json").await.unwrap();
    let back = shell.download_bytes("/tmp/job/data.json").await.unwrap();
    assert_eq!(back, b"{}");
    shell.close().await.unwrap();
}

/// Test: upload_file/download_file bridge the local filesystem.
#[tokio::test]
async fn test_file_transfer_via_local_paths() {
    let shell = ScriptedShell::new();
    let dir = tempfile::tempdir().unwrap();

    let local_in = dir.path().join("model.stan");
    std::fs::write(&local_in, b"parameters { real mu; }").unwrap();
    shell
        .upload_file(&local_in, "/tmp/job/model.stan")
        .await
        .unwrap();

    let local_out = dir.path().join("fetched.stan");
    shell
        .download_file("/tmp/job/model.stan", &local_out)
        .await
        .unwrap();
    assert_eq!(
        std::fs::read(&local_out).unwrap(),
        b"parameters { real mu; }"
    );
}

/// Test: an extension-less remote target is treated as a directory and
/// the local file name is appended.
#[tokio::test]
async fn test_upload_file_defaults_name_into_directory_target() {
    let shell = ScriptedShell::new();
    let dir = tempfile::tempdir().unwrap();

    let local = dir.path().join("eight_schools.stan");
    std::fs::write(&local, b"data { int J; }").unwrap();
    shell.upload_file(&local, "/tmp/job").await.unwrap();

    assert_eq!(
        shell.remote_file("/tmp/job/eight_schools.stan").as_deref(),
        Some(b"data { int J; }".as_slice())
    );
}

/// Test: re-upload fully overwrites, never appends.
#[tokio::test]
async fn test_reupload_overwrites() {
    let shell = ScriptedShell::new();
    shell.upload_bytes(b"first version", "/tmp/f").await.unwrap();
    shell.upload_bytes(b"second", "/tmp/f").await.unwrap();
    assert_eq!(shell.download_bytes("/tmp/f").await.unwrap(), b"second");
}

/// Test: uploading a missing local file is an io error, not a panic.
#[tokio::test]
async fn test_upload_missing_local_file() {
    let shell = ScriptedShell::new();
    let err = shell
        .upload_file(std::path::Path::new("/no/such/file.stan"), "/tmp/x")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Io(_)));
}
