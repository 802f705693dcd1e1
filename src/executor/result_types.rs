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

//! Result types for session operations.

use std::collections::HashMap;
use std::fmt;

use crate::error::OperationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Upload => f.write_str("upload"),
            TransferDirection::Download => f.write_str("download"),
        }
    }
}

/// Outcome of a completed file copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStatus {
    pub direction: TransferDirection,
    pub source: String,
    pub destination: String,
    pub bytes: u64,
}

/// Successful outcome of an operation on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub host: String,
    pub output: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: u32,
    /// Set for file transfers, `None` for commands.
    pub transfer: Option<TransferStatus>,
}

impl OperationResult {
    pub fn for_transfer(host: impl Into<String>, status: TransferStatus) -> Self {
        Self {
            host: host.into(),
            output: Vec::new(),
            stderr: Vec::new(),
            exit_status: 0,
            transfer: Some(status),
        }
    }

    /// Convert stdout to a UTF-8 string
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.output).to_string()
    }

    /// Convert stderr to a UTF-8 string
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Per-host result of a fan-out call.
pub type HostOutcome = Result<OperationResult, OperationError>;

/// Outcomes of one `execute_on_hosts` call, one entry per requested host in
/// request order. Unreachable hosts are present with an error, never omitted.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    outcomes: Vec<(String, HostOutcome)>,
}

impl ExecutionReport {
    pub(crate) fn new(outcomes: Vec<(String, HostOutcome)>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, host: &str) -> Option<&HostOutcome> {
        self.outcomes
            .iter()
            .find(|(h, _)| h == host)
            .map(|(_, outcome)| outcome)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostOutcome)> {
        self.outcomes.iter().map(|(h, o)| (h.as_str(), o))
    }

    pub fn successes(&self) -> impl Iterator<Item = &OperationResult> {
        self.outcomes.iter().filter_map(|(_, o)| o.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationError> {
        self.outcomes.iter().filter_map(|(_, o)| o.as_ref().err())
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_ok())
    }

    pub fn into_map(self) -> HashMap<String, HostOutcome> {
        self.outcomes.into_iter().collect()
    }
}

impl IntoIterator for ExecutionReport {
    type Item = (String, HostOutcome);
    type IntoIter = std::vec::IntoIter<(String, HostOutcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
