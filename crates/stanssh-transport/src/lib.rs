//! stanssh-transport: SSH connection layer for stanssh
//!
//! This crate owns the secure-shell session to a single remote host:
//! - `RemoteEndpoint` describes the target (host, user, key file, port)
//! - `RemoteShell` is the trait the domain layer programs against
//!   (command execution + file transfer primitives)
//! - `SshConnection` is the ssh2-backed implementation
//! - `fakes::ScriptedShell` is an in-memory fake for testing
//!
//! All trait methods are async but strictly sequential from the caller's
//! point of view: one operation at a time per open session.

pub mod endpoint;
pub mod error;
pub mod fakes;
pub mod retry;
pub mod shell;
pub mod ssh;

pub use endpoint::RemoteEndpoint;
pub use error::{TransportError, TransportResult};
pub use retry::{retry_transient, RetryPolicy};
pub use shell::{CommandOutput, RemoteShell};
pub use ssh::SshConnection;
