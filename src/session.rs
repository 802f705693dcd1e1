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

//! The public entry point: a policy plus a transport.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{ConfigError, OperationError, OperationTarget};
use crate::executor::{Dispatcher, ExecutionReport, Operation, OperationResult, ResultGuard};
use crate::host::{HostId, HostList};
use crate::policy::SessionPolicy;
use crate::ssh::SshTransport;
use crate::transport::Transport;
use crate::utils::sanitize::validate_command;

/// Runs commands and copies files on remote hosts without ever prompting.
///
/// The policy is fixed at construction. Host lists are given per call and
/// are not remembered between calls.
///
/// ```no_run
/// use headless_ssh::{RemoteSession, SessionPolicy};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let session = RemoteSession::new(SessionPolicy::default())?;
/// let report = session.execute_on_hosts("uptime", ["web1", "web2"]).await?;
/// for (host, outcome) in report.iter() {
///     match outcome {
///         Ok(result) => print!("{host}: {}", result.stdout_string()),
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct RemoteSession<T: Transport = SshTransport> {
    dispatcher: Dispatcher<T>,
}

impl RemoteSession<SshTransport> {
    /// Build a session over russh. Performs no network I/O.
    pub fn new(policy: SessionPolicy) -> Result<Self, ConfigError> {
        let transport = SshTransport::new(&policy)?;
        Ok(Self::with_transport(policy, transport))
    }
}

impl<T: Transport> RemoteSession<T> {
    pub fn with_transport(policy: SessionPolicy, transport: T) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::new(transport), Arc::new(policy)),
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        self.dispatcher.policy()
    }

    /// Run `command` on every host in parallel.
    ///
    /// Per-host failures are entries in the report. The call itself only
    /// fails with `invalid-argument`, before any connection is made.
    pub async fn execute_on_hosts(
        &self,
        command: &str,
        hosts: impl Into<HostList>,
    ) -> Result<ExecutionReport, OperationError> {
        let hosts = hosts.into();
        let target = OperationTarget::command(command);

        if hosts.is_empty() {
            return Err(ResultGuard::new("[]", &target).invalid_argument("host list is empty"));
        }
        if let Err(e) = validate_command(command) {
            return Err(ResultGuard::new(&hosts.to_string(), &target).invalid_argument(e.to_string()));
        }
        let parsed = parse_hosts(&hosts, &target)?;

        info!(hosts = %hosts, "Executing command '{command}'");
        Ok(self
            .dispatcher
            .dispatch(hosts, parsed, Operation::Command(command.to_string()))
            .await)
    }

    /// Download `remote_path` from a single host into `local_path`.
    pub async fn fetch_file(
        &self,
        host: impl Into<HostList>,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<OperationResult, OperationError> {
        self.transfer(
            host.into(),
            Operation::Download {
                remote_path: remote_path.to_string(),
                local_path: local_path.as_ref().to_path_buf(),
            },
        )
        .await
    }

    /// Upload `local_path` to `remote_path` on a single host.
    pub async fn push_file(
        &self,
        host: impl Into<HostList>,
        local_path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<OperationResult, OperationError> {
        self.transfer(
            host.into(),
            Operation::Upload {
                local_path: local_path.as_ref().to_path_buf(),
                remote_path: remote_path.to_string(),
            },
        )
        .await
    }

    async fn transfer(
        &self,
        hosts: HostList,
        operation: Operation,
    ) -> Result<OperationResult, OperationError> {
        let target = operation.target();

        let Some(host) = hosts.single() else {
            return Err(ResultGuard::new(&hosts.to_string(), &target).invalid_argument(format!(
                "file transfer takes exactly one host, got {}",
                hosts.requested_len()
            )));
        };
        if let OperationTarget::Transfer {
            source,
            destination,
        } = &target
        {
            if source.is_empty() || destination.is_empty() {
                return Err(ResultGuard::new(host, &target)
                    .invalid_argument("source and destination paths must not be empty"));
            }
        }
        let parsed = parse_hosts(&hosts, &target)?;

        info!(host, "Starting {target}");
        let label = host.to_string();
        let report = self.dispatcher.dispatch(hosts, parsed, operation).await;
        match report.into_iter().next() {
            Some((_, outcome)) => outcome,
            None => Err(ResultGuard::new(&label, &target).worker_failed("no outcome reported")),
        }
    }
}

fn parse_hosts(hosts: &HostList, target: &OperationTarget) -> Result<Vec<HostId>, OperationError> {
    hosts
        .iter()
        .map(|host| {
            HostId::parse(host).map_err(|e| {
                ResultGuard::new(host, target).invalid_argument(format!("invalid host: {e}"))
            })
        })
        .collect()
}
