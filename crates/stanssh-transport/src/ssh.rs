//! ssh2-backed `RemoteShell` implementation.
//!
//! libssh2 is a blocking library; every call into it runs inside
//! `tokio::task::spawn_blocking`. One `SshConnection` wraps one
//! authenticated session and must not be shared across concurrent
//! operations (the inner mutex serializes them).

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ssh2::Session;
use tracing::{debug, info};

use crate::endpoint::RemoteEndpoint;
use crate::error::{TransportError, TransportResult};
use crate::retry::{self, RetryPolicy};
use crate::shell::{CommandOutput, RemoteShell};

/// TCP connect timeout for the initial handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated SSH session to one remote host.
pub struct SshConnection {
    endpoint: RemoteEndpoint,
    session: Arc<Mutex<Session>>,
}

impl SshConnection {
    /// Open and authenticate a session against the endpoint.
    ///
    /// Fails with `TransportError::Connection` when the host is unreachable
    /// or the handshake times out, `TransportError::Authentication` when the
    /// key is rejected.
    pub async fn open(endpoint: RemoteEndpoint) -> TransportResult<Self> {
        let ep = endpoint.clone();
        let session = tokio::task::spawn_blocking(move || open_blocking(&ep))
            .await
            .map_err(join_error)??;

        info!(event = "transport.connected", endpoint = %endpoint);
        Ok(Self {
            endpoint,
            session: Arc::new(Mutex::new(session)),
        })
    }

    /// Like [`SshConnection::open`], retrying transient connection failures
    /// with exponential backoff. Authentication failures are never retried.
    pub async fn open_with_retry(
        endpoint: RemoteEndpoint,
        policy: RetryPolicy,
    ) -> TransportResult<Self> {
        retry::retry_transient(&policy, || Self::open(endpoint.clone())).await
    }

    /// The endpoint this connection is bound to.
    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    fn with_session<T, F>(&self, op: F) -> impl std::future::Future<Output = TransportResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Session) -> TransportResult<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        async move {
            tokio::task::spawn_blocking(move || {
                let guard = session.lock().unwrap();
                op(&guard)
            })
            .await
            .map_err(join_error)?
        }
    }
}

#[async_trait]
impl RemoteShell for SshConnection {
    async fn upload_bytes(&self, bytes: &[u8], remote_path: &str) -> TransportResult<()> {
        let bytes = bytes.to_vec();
        let path = remote_path.to_string();
        debug!(event = "transport.upload", path = %path, size = bytes.len());
        self.with_session(move |sess| {
            let sftp = sess.sftp().map_err(|e| transfer_err(&path, e))?;
            let mut file = sftp
                .create(Path::new(&path))
                .map_err(|e| transfer_err(&path, e))?;
            file.write_all(&bytes).map_err(|e| transfer_err(&path, e))?;
            Ok(())
        })
        .await
    }

    async fn download_bytes(&self, remote_path: &str) -> TransportResult<Vec<u8>> {
        let path = remote_path.to_string();
        debug!(event = "transport.download", path = %path);
        self.with_session(move |sess| {
            let sftp = sess.sftp().map_err(|e| transfer_err(&path, e))?;
            let mut file = sftp
                .open(Path::new(&path))
                .map_err(|e| transfer_err(&path, e))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .map_err(|e| transfer_err(&path, e))?;
            Ok(buf)
        })
        .await
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> TransportResult<()> {
        let bytes = self.download_bytes(remote_path).await?;
        std::fs::write(local_path, bytes)?;
        Ok(())
    }

    async fn run(&self, command: &str) -> TransportResult<CommandOutput> {
        let cmd = command.to_string();
        let ep = self.endpoint.clone();
        debug!(event = "transport.exec", command = %cmd);
        self.with_session(move |sess| {
            let start = Instant::now();
            let mut channel = sess
                .channel_session()
                .map_err(|e| connection_err(&ep, e.to_string()))?;
            channel
                .exec(&cmd)
                .map_err(|e| connection_err(&ep, e.to_string()))?;

            let mut stdout = String::new();
            channel
                .read_to_string(&mut stdout)
                .map_err(TransportError::Io)?;
            let mut stderr = String::new();
            channel
                .stderr()
                .read_to_string(&mut stderr)
                .map_err(TransportError::Io)?;

            channel
                .wait_close()
                .map_err(|e| connection_err(&ep, e.to_string()))?;
            let exit_code = channel
                .exit_status()
                .map_err(|e| connection_err(&ep, e.to_string()))?;
            let duration_ms = start.elapsed().as_millis() as u64;

            if exit_code != 0 {
                return Err(TransportError::RemoteExecution {
                    command: cmd,
                    exit_code,
                    stdout,
                    stderr,
                });
            }

            Ok(CommandOutput {
                exit_code,
                stdout,
                stderr,
                duration_ms,
            })
        })
        .await
    }

    async fn mkdir_all(&self, remote_path: &str) -> TransportResult<()> {
        let path = remote_path.to_string();
        self.with_session(move |sess| {
            let sftp = sess.sftp().map_err(|e| transfer_err(&path, e))?;
            for prefix in dir_prefixes(&path) {
                let dir = Path::new(&prefix);
                if sftp.stat(dir).is_err() {
                    sftp.mkdir(dir, 0o755)
                        .map_err(|e| transfer_err(&prefix, e))?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn close(&self) -> TransportResult<()> {
        let ep = self.endpoint.clone();
        self.with_session(move |sess| {
            sess.disconnect(None, "session closed", None)
                .map_err(|e| connection_err(&ep, e.to_string()))
        })
        .await
    }
}

fn open_blocking(endpoint: &RemoteEndpoint) -> TransportResult<Session> {
    let addr = endpoint
        .address()
        .to_socket_addrs()
        .map_err(|e| connection_err(endpoint, e.to_string()))?
        .next()
        .ok_or_else(|| connection_err(endpoint, "address resolved to nothing".to_string()))?;

    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| connection_err(endpoint, e.to_string()))?;

    let mut session = Session::new().map_err(|e| connection_err(endpoint, e.to_string()))?;
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| connection_err(endpoint, e.to_string()))?;

    session
        .userauth_pubkey_file(
            &endpoint.username,
            None,
            &endpoint.key_path,
            endpoint.passphrase.as_deref(),
        )
        .map_err(|e| TransportError::Authentication {
            host: endpoint.host.clone(),
            username: endpoint.username.clone(),
            reason: e.to_string(),
        })?;

    if !session.authenticated() {
        return Err(TransportError::Authentication {
            host: endpoint.host.clone(),
            username: endpoint.username.clone(),
            reason: "key was not accepted".to_string(),
        });
    }

    Ok(session)
}

fn connection_err(endpoint: &RemoteEndpoint, reason: String) -> TransportError {
    TransportError::Connection {
        host: endpoint.host.clone(),
        port: endpoint.port,
        reason,
    }
}

/// Every directory prefix of `path`, shallowest first, keeping the path
/// relative when it was given relative.
fn dir_prefixes(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut prefixes = Vec::new();
    let mut prefix = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !prefix.is_empty() || absolute {
            prefix.push('/');
        }
        prefix.push_str(part);
        prefixes.push(prefix.clone());
    }
    prefixes
}

fn transfer_err(path: &str, err: impl std::fmt::Display) -> TransportError {
    TransportError::Transfer {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

fn join_error(err: tokio::task::JoinError) -> TransportError {
    TransportError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_prefixes_absolute() {
        assert_eq!(
            dir_prefixes("/tmp/stanssh/job-1"),
            vec!["/tmp", "/tmp/stanssh", "/tmp/stanssh/job-1"]
        );
    }

    #[test]
    fn test_dir_prefixes_keep_relative_roots_relative() {
        assert_eq!(
            dir_prefixes("stan-work/job-1"),
            vec!["stan-work", "stan-work/job-1"]
        );
    }

    #[test]
    fn test_dir_prefixes_ignore_doubled_separators() {
        assert_eq!(dir_prefixes("/tmp//stanssh/"), vec!["/tmp", "/tmp/stanssh"]);
    }
}
