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

use futures::future::join_all;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use super::context::{quiet, with_context, CallContext};
use super::guard::ResultGuard;
use super::result_types::{ExecutionReport, HostOutcome, TransferStatus};
use super::retry::{connect_with_retry, RetryPolicy};
use crate::error::OperationTarget;
use crate::host::{HostId, HostList};
use crate::policy::SessionPolicy;
use crate::transport::{CommandOutput, ConnectOptions, Connection, Transport, TransportError};

/// One unit of remote work, run on every host of a call.
#[derive(Debug, Clone)]
pub enum Operation {
    Command(String),
    Upload { local_path: PathBuf, remote_path: String },
    Download { remote_path: String, local_path: PathBuf },
}

impl Operation {
    pub fn target(&self) -> OperationTarget {
        match self {
            Operation::Command(command) => OperationTarget::command(command),
            Operation::Upload {
                local_path,
                remote_path,
            } => OperationTarget::transfer(local_path.display().to_string(), remote_path),
            Operation::Download {
                remote_path,
                local_path,
            } => OperationTarget::transfer(remote_path, local_path.display().to_string()),
        }
    }

    async fn run<C: Connection>(&self, conn: &mut C) -> Result<Completed, TransportError> {
        match self {
            Operation::Command(command) => conn.run_command(command).await.map(Completed::Command),
            Operation::Upload {
                local_path,
                remote_path,
            } => conn
                .upload(local_path, remote_path)
                .await
                .map(Completed::Transfer),
            Operation::Download {
                remote_path,
                local_path,
            } => conn
                .download(remote_path, local_path)
                .await
                .map(Completed::Transfer),
        }
    }
}

enum Completed {
    Command(CommandOutput),
    Transfer(TransferStatus),
}

/// Fans an operation out to every host of a call, one task per host.
///
/// There is no concurrency cap. A failing, hanging or panicking host only
/// affects its own entry in the report.
pub struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    policy: Arc<SessionPolicy>,
    next_call_id: AtomicU64,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: Arc<T>, policy: Arc<SessionPolicy>) -> Self {
        Self {
            transport,
            policy,
            next_call_id: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Run `operation` on each of `hosts` in parallel.
    ///
    /// `hosts` must already be parsed from `list`, in the same order.
    pub async fn dispatch(
        &self,
        list: HostList,
        hosts: Vec<HostId>,
        operation: Operation,
    ) -> ExecutionReport {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let list = Arc::new(list);
        let operation = Arc::new(operation);
        let target = operation.target();
        debug!(call_id, hosts = %list, %target, "Dispatching");

        let tasks = hosts
            .iter()
            .map(|host| {
                let ctx = CallContext {
                    call_id,
                    hosts: Arc::clone(&list),
                    host: host.label.clone(),
                    target: target.clone(),
                };
                let transport = Arc::clone(&self.transport);
                let policy = Arc::clone(&self.policy);
                let operation = Arc::clone(&operation);
                let host = host.clone();

                tokio::spawn(with_context(
                    ctx,
                    quiet(run_on_host(transport, policy, host, operation)),
                ))
            })
            .collect::<Vec<_>>();

        let results = join_all(tasks).await;
        self.collect_results(&hosts, &target, results)
    }

    fn collect_results(
        &self,
        hosts: &[HostId],
        target: &OperationTarget,
        results: Vec<Result<HostOutcome, tokio::task::JoinError>>,
    ) -> ExecutionReport {
        let outcomes = hosts
            .iter()
            .zip(results)
            .map(|(host, result)| {
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("Task failed for host {}: {}", host, e);
                        Err(ResultGuard::new(&host.label, target).worker_failed(e))
                    }
                };
                (host.label.clone(), outcome)
            })
            .collect();
        ExecutionReport::new(outcomes)
    }
}

async fn run_on_host<T: Transport>(
    transport: Arc<T>,
    policy: Arc<SessionPolicy>,
    host: HostId,
    operation: Arc<Operation>,
) -> HostOutcome {
    let target = operation.target();
    let guard = ResultGuard::new(&host.label, &target);
    let options = ConnectOptions::for_host(&policy, &host);
    let retry = RetryPolicy::from_policy(&policy);

    let mut conn = connect_with_retry(transport.as_ref(), &host, &options, &retry)
        .await
        .map_err(|e| guard.connect_failed(e))?;

    let result = tokio::time::timeout(policy.command_timeout(), operation.run(&mut conn)).await;

    if tokio::time::timeout(options.network_timeout, conn.close())
        .await
        .is_err()
    {
        debug!(host = %host, "Disconnect timed out");
    }

    match result {
        Err(_) => Err(guard.timed_out(policy.command_timeout())),
        Ok(Err(e)) => Err(guard.operation_failed(e)),
        Ok(Ok(Completed::Command(output))) => guard.command_finished(output),
        Ok(Ok(Completed::Transfer(status))) => Ok(guard.transfer_finished(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_targets() {
        let cmd = Operation::Command("uptime".to_string());
        assert_eq!(cmd.target(), OperationTarget::command("uptime"));

        let up = Operation::Upload {
            local_path: PathBuf::from("out.txt"),
            remote_path: "/tmp/out.txt".to_string(),
        };
        assert_eq!(
            up.target(),
            OperationTarget::transfer("out.txt", "/tmp/out.txt")
        );

        let down = Operation::Download {
            remote_path: "/tmp/out.txt".to_string(),
            local_path: PathBuf::from("out.txt"),
        };
        assert_eq!(
            down.target(),
            OperationTarget::transfer("/tmp/out.txt", "out.txt")
        );
    }
}
