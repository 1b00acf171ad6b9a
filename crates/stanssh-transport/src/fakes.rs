//! In-memory fake for the `RemoteShell` trait (testing only)
//!
//! `ScriptedShell` keeps a remote filesystem as a `HashMap<path, bytes>`,
//! pops scripted command outputs in order, and records every invocation so
//! tests can assert "no network call happened before local validation".

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{TransportError, TransportResult};
use crate::shell::{CommandOutput, RemoteShell};

/// One recorded call against the fake shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    Upload(String),
    Download(String),
    Run(String),
    MkdirAll(String),
    Close,
}

/// Scripted in-memory `RemoteShell`.
#[derive(Debug, Default)]
pub struct ScriptedShell {
    files: Mutex<HashMap<String, Vec<u8>>>,
    outputs: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<ShellCall>>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output for the next `run` call. Nonzero exit codes are
    /// surfaced as `TransportError::RemoteExecution`, like the real shell.
    pub fn push_output(&self, exit_code: i32, stdout: &str, stderr: &str) {
        self.outputs.lock().unwrap().push_back(CommandOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration_ms: 1,
        });
    }

    /// Queue a clean exit for the next `run` call.
    pub fn push_ok(&self) {
        self.push_output(0, "", "");
    }

    /// Seed a file on the fake remote filesystem.
    pub fn put_remote_file(&self, path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    /// Read back a file from the fake remote filesystem.
    pub fn remote_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Total number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The commands passed to `run`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ShellCall::Run(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ShellCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    async fn upload_bytes(&self, bytes: &[u8], remote_path: &str) -> TransportResult<()> {
        self.record(ShellCall::Upload(remote_path.to_string()));
        self.files
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn download_bytes(&self, remote_path: &str) -> TransportResult<Vec<u8>> {
        self.record(ShellCall::Download(remote_path.to_string()));
        self.files
            .lock()
            .unwrap()
            .get(remote_path)
            .cloned()
            .ok_or_else(|| TransportError::Transfer {
                path: remote_path.to_string(),
                reason: "no such file".to_string(),
            })
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> TransportResult<()> {
        let bytes = self.download_bytes(remote_path).await?;
        std::fs::write(local_path, bytes)?;
        Ok(())
    }

    async fn run(&self, command: &str) -> TransportResult<CommandOutput> {
        self.record(ShellCall::Run(command.to_string()));
        let output = self
            .outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 1,
            });

        if output.exit_code != 0 {
            return Err(TransportError::RemoteExecution {
                command: command.to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    async fn mkdir_all(&self, remote_path: &str) -> TransportResult<()> {
        self.record(ShellCall::MkdirAll(remote_path.to_string()));
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        self.record(ShellCall::Close);
        Ok(())
    }
}
