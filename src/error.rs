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

//! Error types surfaced to callers of [`RemoteSession`](crate::RemoteSession).
//!
//! Every failure a session operation can produce is normalized into an
//! [`OperationError`] tagged with an [`ErrorKind`]. Construction-time problems
//! with a [`SessionPolicy`](crate::SessionPolicy) are reported separately as
//! [`ConfigError`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No session could be established within the retry and timeout budget.
    ConnectionFailure,
    /// The remote command ran but exited non-zero (or never finished).
    CommandFailure,
    /// A file upload or download failed.
    TransferFailure,
    /// The transport needed interactive input, which headless mode forbids.
    ///
    /// This points at a configuration defect (missing or rejected key,
    /// unknown or changed host key) and is never retried.
    PromptRequired,
    /// The caller passed arguments the operation cannot accept.
    InvalidArgument,
}

impl ErrorKind {
    /// Stable, kebab-case name used in log fields and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionFailure => "connection-failure",
            ErrorKind::CommandFailure => "command-failure",
            ErrorKind::TransferFailure => "transfer-failure",
            ErrorKind::PromptRequired => "prompt-required",
            ErrorKind::InvalidArgument => "invalid-argument",
        }
    }

    /// Whether retrying the same operation later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionFailure | ErrorKind::TransferFailure
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an operation was trying to do when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTarget {
    /// A remote shell command.
    Command(String),
    /// A file copy from `source` to `destination`.
    Transfer { source: String, destination: String },
}

impl OperationTarget {
    pub fn command(command: impl Into<String>) -> Self {
        OperationTarget::Command(command.into())
    }

    pub fn transfer(source: impl Into<String>, destination: impl Into<String>) -> Self {
        OperationTarget::Transfer {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, OperationTarget::Transfer { .. })
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationTarget::Command(command) => write!(f, "command '{command}'"),
            OperationTarget::Transfer {
                source,
                destination,
            } => write!(f, "file transfer ({source} - {destination})"),
        }
    }
}

/// A normalized failure for one host.
///
/// Carries the kind, the command or file pair, the host, and the cause text
/// from the underlying failure. Command failures also carry the exit status
/// and whatever output was captured before the command ended.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {target} on {host} failed: {cause}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub target: OperationTarget,
    pub host: String,
    pub cause: String,
    pub exit_status: Option<u32>,
    pub output: Option<String>,
}

impl OperationError {
    pub fn new(
        kind: ErrorKind,
        target: OperationTarget,
        host: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            host: host.into(),
            cause: cause.into(),
            exit_status: None,
            output: None,
        }
    }

    /// Caller misuse detected before any network I/O.
    pub fn invalid_argument(
        target: OperationTarget,
        host: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::InvalidArgument, target, host, cause)
    }

    pub fn with_exit_status(mut self, exit_status: u32) -> Self {
        self.exit_status = Some(exit_status);
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_prompt_required(&self) -> bool {
        self.kind == ErrorKind::PromptRequired
    }
}

/// Rejected session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("key file path is empty")]
    EmptyKeyFile,

    #[error("invalid gateway host '{host}': {reason}")]
    InvalidGateway { host: String, reason: String },

    #[error("invalid default user '{user}'")]
    InvalidUser { user: String },

    #[error("failed to read policy file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("transport rejected configuration: {0}")]
    Transport(String),
}
