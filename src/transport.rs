// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Boundary between the session core and a remote-shell client.
//!
//! The dispatcher owns retry, timeouts and error classification; a
//! [`Transport`] only has to open one connection per call and run one
//! operation on it. [`SshTransport`](crate::ssh::SshTransport) is the russh
//! implementation; tests plug in scripted transports.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::executor::TransferStatus;
use crate::host::HostId;
use crate::policy::{HostKeyPolicy, SessionPolicy};

/// Everything a transport needs to open one connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub user: String,
    pub network_timeout: Duration,
    /// When set, the only key offered; otherwise default discovery.
    pub key_file: Option<PathBuf>,
    pub gateway: Option<HostId>,
    pub host_key_policy: HostKeyPolicy,
}

impl ConnectOptions {
    pub fn for_host(policy: &SessionPolicy, host: &HostId) -> Self {
        Self {
            user: host.effective_user(policy.user()),
            network_timeout: policy.network_timeout(),
            key_file: policy.key_file().map(Path::to_path_buf),
            gateway: policy.gateway().cloned(),
            host_key_policy: policy.host_key_policy(),
        }
    }
}

/// Raw output of a finished remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Meaningless when `exit_signal` is set.
    pub exit_status: u32,
    /// Name of the signal that killed the command, without the `SIG` prefix.
    pub exit_signal: Option<String>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client would have asked the user for input.
    #[error("interactive input required: {0}")]
    InteractionRequired(String),

    #[error("host key for {host} is not in known_hosts")]
    HostKeyUnknown { host: String },

    #[error("host key for {host} does not match known_hosts line {line}")]
    HostKeyChanged { host: String, line: usize },

    #[error("server rejected every offered key for user {user}")]
    KeyAuthFailed { user: String },

    #[error("cannot reach {host}: {reason}")]
    Unreachable { host: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote command ended without an exit status")]
    ExitStatusMissing,

    #[error("remote file {path}: {reason}")]
    RemoteFile { path: String, reason: String },

    #[error("channel error: {0}")]
    Channel(String),
}

impl TransportError {
    /// Whether an interactive client would have prompted here.
    ///
    /// These point at configuration problems and are never retried.
    pub fn requires_interaction(&self) -> bool {
        match self {
            TransportError::InteractionRequired(_)
            | TransportError::HostKeyUnknown { .. }
            | TransportError::HostKeyChanged { .. }
            | TransportError::KeyAuthFailed { .. }
            | TransportError::Key(_) => true,
            TransportError::Ssh(russh::Error::UnknownKey) => true,
            TransportError::Ssh(russh::Error::Keys(_)) => true,
            _ => false,
        }
    }

    /// Whether another connection attempt could succeed.
    pub fn is_transient(&self) -> bool {
        if self.requires_interaction() {
            return false;
        }
        matches!(
            self,
            TransportError::Ssh(_)
                | TransportError::Io(_)
                | TransportError::Unreachable { .. }
                | TransportError::Timeout(_)
        )
    }
}

/// Opens connections to remote hosts.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    /// Open and authenticate one connection. Called once per attempt; the
    /// caller bounds each call by `options.network_timeout`.
    async fn connect(
        &self,
        host: &HostId,
        options: &ConnectOptions,
    ) -> Result<Self::Connection, TransportError>;
}

/// An authenticated connection to one host.
#[async_trait]
pub trait Connection: Send + 'static {
    async fn run_command(&mut self, command: &str) -> Result<CommandOutput, TransportError>;

    async fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<TransferStatus, TransportError>;

    async fn download(
        &mut self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<TransferStatus, TransportError>;

    /// Best-effort disconnect.
    async fn close(&mut self);
}
