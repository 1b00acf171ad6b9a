//! The `RemoteShell` trait — what the domain layer programs against.

use async_trait::async_trait;
use std::path::Path;

use crate::error::TransportResult;

/// Captured output of a completed remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Whether the command exited cleanly.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command execution and file transfer primitives over one open session.
///
/// Contract:
/// - Uploads create or fully overwrite the remote file (idempotent re-upload,
///   so a retried transfer never leaves a partial file observable).
/// - `download_bytes` fails with `TransportError::Transfer` when the remote
///   file is absent, e.g. a remote computation that never produced output.
/// - `run` blocks the caller until the remote process exits and fails with
///   `TransportError::RemoteExecution` on nonzero exit, stderr preserved.
/// - Callers must serialize operations against one session; open independent
///   connections for independent concurrent work.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Create/overwrite `remote_path` with the given bytes.
    async fn upload_bytes(&self, bytes: &[u8], remote_path: &str) -> TransportResult<()>;

    /// Create/overwrite a remote file from a local one.
    ///
    /// When `remote_path` names a file (has an extension) it is used as
    /// given; when it names a directory, the local file name is appended.
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> TransportResult<()> {
        let bytes = std::fs::read(local_path)?;
        let target = resolve_remote_target(local_path, remote_path);
        self.upload_bytes(&bytes, &target).await
    }

    /// Read the full contents of a remote file.
    async fn download_bytes(&self, remote_path: &str) -> TransportResult<Vec<u8>>;

    /// Copy a remote file to a local path.
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> TransportResult<()>;

    /// Execute a command on the remote host, waiting for it to exit.
    async fn run(&self, command: &str) -> TransportResult<CommandOutput>;

    /// Create a remote directory and any missing parents.
    async fn mkdir_all(&self, remote_path: &str) -> TransportResult<()>;

    /// Release the underlying session handles. Also happens on drop.
    async fn close(&self) -> TransportResult<()>;
}

/// Resolve the remote target for a file upload. A `remote_path` whose last
/// segment has no extension is treated as a directory and gets the local
/// file name appended.
pub fn resolve_remote_target(local_path: &Path, remote_path: &str) -> String {
    let last = remote_path.rsplit('/').next().unwrap_or("");
    if last.contains('.') {
        return remote_path.to_string();
    }
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", remote_path.trim_end_matches('/'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_explicit_file_target() {
        let target = resolve_remote_target(
            Path::new("/home/me/eight_schools.stan"),
            "/tmp/job/model.stan",
        );
        assert_eq!(target, "/tmp/job/model.stan");
    }

    #[test]
    fn test_resolve_appends_local_name_to_directory_target() {
        let target =
            resolve_remote_target(Path::new("/home/me/eight_schools.stan"), "/tmp/job");
        assert_eq!(target, "/tmp/job/eight_schools.stan");

        // trailing slash does not double the separator
        let target =
            resolve_remote_target(Path::new("/home/me/eight_schools.stan"), "/tmp/job/");
        assert_eq!(target, "/tmp/job/eight_schools.stan");
    }

    #[test]
    fn test_command_output_success() {
        let out = CommandOutput {
            exit_code: 0,
            stdout: "ok".to_string(),
            stderr: String::new(),
            duration_ms: 12,
        };
        assert!(out.success());

        let out = CommandOutput { exit_code: 1, ..out };
        assert!(!out.success());
    }
}
