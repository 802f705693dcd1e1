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

//! Normalization of per-host outcomes.
//!
//! Every way an operation can end on a host (exit status, transport error,
//! timeout, panic, or a would-be prompt) passes through [`ResultGuard`] and
//! comes out as an [`OperationResult`] or a classified [`OperationError`].
//! Each error is logged at warning level on its way out.

use std::time::Duration;
use tracing::warn;

use crate::error::{ErrorKind, OperationError, OperationTarget};
use crate::executor::result_types::{HostOutcome, OperationResult, TransferStatus};
use crate::transport::{CommandOutput, TransportError};

pub struct ResultGuard<'a> {
    host: &'a str,
    target: &'a OperationTarget,
}

impl<'a> ResultGuard<'a> {
    pub fn new(host: &'a str, target: &'a OperationTarget) -> Self {
        Self { host, target }
    }

    /// No usable connection after the retry budget was spent.
    pub fn connect_failed(&self, err: TransportError) -> OperationError {
        let kind = if err.requires_interaction() {
            ErrorKind::PromptRequired
        } else if self.target.is_transfer() {
            ErrorKind::TransferFailure
        } else {
            ErrorKind::ConnectionFailure
        };
        self.report(OperationError::new(
            kind,
            self.target.clone(),
            self.host,
            err.to_string(),
        ))
    }

    pub fn command_finished(&self, output: CommandOutput) -> HostOutcome {
        if output.exit_status == 0 && output.exit_signal.is_none() {
            return Ok(OperationResult {
                host: self.host.to_string(),
                output: output.output,
                stderr: output.stderr,
                exit_status: 0,
                transfer: None,
            });
        }

        let ending = match &output.exit_signal {
            Some(signal) => format!("killed by signal {signal}"),
            None => format!("exited with status {}", output.exit_status),
        };
        let stderr = String::from_utf8_lossy(&output.stderr);
        let cause = match stderr.trim() {
            "" => ending,
            text => format!("{ending}: {text}"),
        };
        let err = OperationError::new(
            ErrorKind::CommandFailure,
            self.target.clone(),
            self.host,
            cause,
        )
        .with_output(String::from_utf8_lossy(&output.output));
        let err = match output.exit_signal {
            Some(_) => err,
            None => err.with_exit_status(output.exit_status),
        };
        Err(self.report(err))
    }

    pub fn transfer_finished(&self, status: TransferStatus) -> OperationResult {
        OperationResult::for_transfer(self.host, status)
    }

    /// The connection was up but the operation itself failed.
    pub fn operation_failed(&self, err: TransportError) -> OperationError {
        let kind = if err.requires_interaction() {
            ErrorKind::PromptRequired
        } else if self.target.is_transfer() {
            ErrorKind::TransferFailure
        } else if matches!(err, TransportError::ExitStatusMissing) {
            ErrorKind::CommandFailure
        } else {
            ErrorKind::ConnectionFailure
        };
        self.report(OperationError::new(
            kind,
            self.target.clone(),
            self.host,
            err.to_string(),
        ))
    }

    pub fn timed_out(&self, limit: Duration) -> OperationError {
        let kind = if self.target.is_transfer() {
            ErrorKind::TransferFailure
        } else {
            ErrorKind::CommandFailure
        };
        self.report(OperationError::new(
            kind,
            self.target.clone(),
            self.host,
            format!("did not finish within {limit:?}"),
        ))
    }

    /// The per-host worker task died before producing an outcome.
    pub fn worker_failed(&self, cause: impl std::fmt::Display) -> OperationError {
        let kind = if self.target.is_transfer() {
            ErrorKind::TransferFailure
        } else {
            ErrorKind::CommandFailure
        };
        self.report(OperationError::new(
            kind,
            self.target.clone(),
            self.host,
            format!("task execution failed: {cause}"),
        ))
    }

    /// Caller input rejected before any connection was attempted.
    pub fn invalid_argument(&self, cause: impl Into<String>) -> OperationError {
        self.report(OperationError::invalid_argument(
            self.target.clone(),
            self.host,
            cause,
        ))
    }

    fn report(&self, err: OperationError) -> OperationError {
        warn!(
            host = %err.host,
            kind = %err.kind,
            target = %err.target,
            exit_status = ?err.exit_status,
            "{}",
            err.cause
        );
        err
    }
}
