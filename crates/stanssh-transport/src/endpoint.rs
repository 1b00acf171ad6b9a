//! Remote endpoint description.

use std::path::{Path, PathBuf};

/// Identity of the single remote target for a connection's lifetime.
///
/// The private key never leaves the local machine; the matching public key
/// is assumed to already be in the remote host's `authorized_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Target host address name.
    pub host: String,

    /// Username for login.
    pub username: String,

    /// Path to the local private key file.
    pub key_path: PathBuf,

    /// SSH port (22 unless overridden).
    pub port: u16,

    /// Passphrase for the private key, if it has one.
    pub passphrase: Option<String>,
}

impl RemoteEndpoint {
    /// Endpoint on the default SSH port with an unencrypted key.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        key_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            key_path: key_path.as_ref().to_path_buf(),
            port: 22,
            passphrase: None,
        }
    }

    /// Override the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Supply a key passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// `host:port` address string for the TCP connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}
