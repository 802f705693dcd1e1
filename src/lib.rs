//! Headless remote command execution and file transfer over SSH.
//!
//! A [`RemoteSession`] fans a command out to many hosts in parallel, or
//! copies a file to or from one host, and never waits on an interactive
//! prompt: anything that would have asked for a password, passphrase or
//! host key confirmation fails at once as [`ErrorKind::PromptRequired`].

pub mod error;
pub mod executor;
pub mod host;
pub mod policy;
pub mod session;
pub mod ssh;
pub mod transport;
pub mod utils;

pub use error::{ConfigError, ErrorKind, OperationError, OperationTarget};
pub use executor::{ExecutionReport, HostOutcome, OperationResult, TransferDirection, TransferStatus};
pub use host::{HostId, HostList};
pub use policy::{HostKeyPolicy, SessionPolicy, SessionPolicyBuilder};
pub use session::RemoteSession;
pub use ssh::SshTransport;
pub use transport::{CommandOutput, ConnectOptions, Connection, Transport, TransportError};
