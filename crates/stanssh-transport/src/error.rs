//! Error taxonomy for the transport layer.

/// Errors produced by the SSH connection layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Key-based authentication was rejected by the remote host.
    #[error("authentication failed for {username}@{host}: {reason}")]
    Authentication {
        host: String,
        username: String,
        reason: String,
    },

    /// The host is unreachable, or the handshake timed out.
    #[error("cannot connect to {host}:{port}: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    /// Upload or download failed, including "remote file not found"
    /// when a remote computation never produced its output.
    #[error("transfer failed for {path}: {reason}")]
    Transfer { path: String, reason: String },

    /// A remote command exited nonzero. stdout/stderr are preserved
    /// verbatim; stderr is the only diagnostic signal for remote-side
    /// failures, so it is part of the display output.
    #[error("remote command `{command}` exited with code {exit_code}: {stderr}")]
    RemoteExecution {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Local I/O error (reading a key file, writing a downloaded artifact).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this error is worth retrying at connection-open time.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Connection { .. })
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
