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

//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use headless_ssh::executor::context;
use headless_ssh::{
    CommandOutput, ConnectOptions, Connection, HostId, SessionPolicy, TransferDirection,
    TransferStatus, Transport, TransportError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a scripted host responds.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Connects; commands print `stdout` and exit with `exit_status`.
    Run { stdout: String, exit_status: u32 },
    /// Every connection attempt is refused.
    Refuse,
    /// Connection attempts never complete.
    Stall,
    /// Authentication would need a password.
    Prompt,
    /// Connects; commands print `stdout` and are killed by `signal`.
    Killed { stdout: String, signal: String },
    /// Connects, but commands never finish.
    Hang,
    /// Connects, then the worker panics while running the command.
    Panic,
}

impl Behavior {
    pub fn ok(stdout: &str) -> Self {
        Behavior::Run {
            stdout: stdout.to_string(),
            exit_status: 0,
        }
    }

    pub fn exit(stdout: &str, exit_status: u32) -> Self {
        Behavior::Run {
            stdout: stdout.to_string(),
            exit_status,
        }
    }
}

/// What a scripted command observed about its task-local context.
#[derive(Debug, Clone)]
pub struct Observation {
    pub host: String,
    pub command: String,
    pub call_id: Option<u64>,
    pub call_hosts: Vec<String>,
    pub quiet: bool,
}

#[derive(Default)]
struct State {
    connects: HashMap<String, u32>,
    observations: Vec<Observation>,
    remote_files: HashMap<String, Vec<u8>>,
    last_options: Option<ConnectOptions>,
}

#[derive(Clone)]
pub struct ScriptedTransport {
    behaviors: Arc<HashMap<String, Behavior>>,
    fallback: Behavior,
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new<'a>(behaviors: impl IntoIterator<Item = (&'a str, Behavior)>) -> Self {
        Self {
            behaviors: Arc::new(
                behaviors
                    .into_iter()
                    .map(|(h, b)| (h.to_string(), b))
                    .collect(),
            ),
            fallback: Behavior::ok(""),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn connect_count(&self, host: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .connects
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.state.lock().unwrap().observations.clone()
    }

    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.state.lock().unwrap().last_options.clone()
    }

    pub fn put_remote_file(&self, path: &str, contents: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .remote_files
            .insert(path.to_string(), contents.to_vec());
    }

    pub fn remote_file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().remote_files.get(path).cloned()
    }

    fn behavior(&self, host: &str) -> Behavior {
        self.behaviors
            .get(host)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(
        &self,
        host: &HostId,
        options: &ConnectOptions,
    ) -> Result<ScriptedConnection, TransportError> {
        {
            let mut state = self.state.lock().unwrap();
            *state.connects.entry(host.label.clone()).or_default() += 1;
            state.last_options = Some(options.clone());
        }

        let behavior = self.behavior(&host.label);
        match behavior {
            Behavior::Refuse => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Behavior::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::Channel("unreachable".to_string()))
            }
            Behavior::Prompt => Err(TransportError::InteractionRequired(format!(
                "no key available for {}",
                host.label
            ))),
            behavior => Ok(ScriptedConnection {
                host: host.label.clone(),
                behavior,
                state: Arc::clone(&self.state),
            }),
        }
    }
}

pub struct ScriptedConnection {
    host: String,
    behavior: Behavior,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn run_command(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        let ctx = context::current();
        self.state.lock().unwrap().observations.push(Observation {
            host: self.host.clone(),
            command: command.to_string(),
            call_id: ctx.as_ref().map(|c| c.call_id),
            call_hosts: ctx
                .map(|c| c.hosts.iter().map(str::to_string).collect())
                .unwrap_or_default(),
            quiet: context::is_quiet(),
        });

        match &self.behavior {
            Behavior::Run {
                stdout,
                exit_status,
            } => Ok(CommandOutput {
                output: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
                exit_status: *exit_status,
                exit_signal: None,
            }),
            Behavior::Killed { stdout, signal } => Ok(CommandOutput {
                output: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
                exit_status: 0,
                exit_signal: Some(signal.clone()),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::ExitStatusMissing)
            }
            Behavior::Panic => panic!("scripted worker panic on {}", self.host),
            _ => Err(TransportError::Channel("not connected".to_string())),
        }
    }

    async fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<TransferStatus, TransportError> {
        let contents = std::fs::read(local_path)?;
        let bytes = contents.len() as u64;
        self.state
            .lock()
            .unwrap()
            .remote_files
            .insert(remote_path.to_string(), contents);
        Ok(TransferStatus {
            direction: TransferDirection::Upload,
            source: local_path.display().to_string(),
            destination: remote_path.to_string(),
            bytes,
        })
    }

    async fn download(
        &mut self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<TransferStatus, TransportError> {
        let contents = self
            .state
            .lock()
            .unwrap()
            .remote_files
            .get(remote_path)
            .cloned()
            .ok_or_else(|| TransportError::RemoteFile {
                path: remote_path.to_string(),
                reason: "no such file".to_string(),
            })?;
        std::fs::write(local_path, &contents)?;
        Ok(TransferStatus {
            direction: TransferDirection::Download,
            source: remote_path.to_string(),
            destination: local_path.display().to_string(),
            bytes: contents.len() as u64,
        })
    }

    async fn close(&mut self) {}
}

/// A policy with short timeouts and no backoff to speak of.
pub fn fast_policy(attempts: u32) -> SessionPolicy {
    SessionPolicy::builder()
        .connection_attempts(attempts)
        .network_timeout(Duration::from_millis(200))
        .command_timeout(Duration::from_millis(500))
        .retry_delay(Duration::from_millis(1))
        .build()
        .unwrap()
}
