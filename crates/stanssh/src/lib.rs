//! stanssh: run Stan models on a remote host over SSH.
//!
//! The hard work — model compilation and MCMC sampling — happens in the
//! modeling package installed on the remote host. This crate orchestrates:
//! authenticate, upload model source and JSON input data, invoke the remote
//! compile and run commands, download and deserialize the results.
//!
//! ```ignore
//! use stanssh::{DataBundle, ModelSession, RunParameters, StanBackend};
//! use stanssh::transport::{RemoteEndpoint, SshConnection};
//!
//! let endpoint = RemoteEndpoint::new("stan.example.org", "sampler", "~/.ssh/id_ed25519");
//! let shell = SshConnection::open(endpoint).await?;
//!
//! let mut session = ModelSession::new(shell, StanBackend::Current);
//! session.load_source_file("eight_schools.stan")?;
//! session.compile().await?;
//!
//! let mut data = DataBundle::new();
//! data.insert("J", 8i64);
//! data.insert("y", vec![28.0, 8.0, -3.0, 7.0, -1.0, 1.0, 18.0, 12.0]);
//!
//! let result = session.sample(&data, &RunParameters::sample(4, 1000)).await?;
//! println!("mu draws: {:?}", result.parameter("mu"));
//! ```

pub mod backend;
pub mod capability;
pub mod config;
pub mod data;
pub mod error;
pub mod obs;
pub mod params;
pub mod results;
pub mod session;

/// The SSH connection layer, re-exported for callers.
pub use stanssh_transport as transport;

pub use backend::{RunManifest, StanBackend};
pub use capability::Capability;
pub use config::{SessionConfig, SessionLayout};
pub use data::{from_json_bytes, DataBundle, StanValue};
pub use error::{Result, StanError, ValidationError};
pub use params::{Algorithm, RunParameters};
pub use results::{ChainDraws, RunResult};
pub use session::{ModelSession, SessionState};
