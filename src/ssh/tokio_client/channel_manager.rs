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

//! Session channels and remote command execution.

use russh::client::Msg;
use russh::{Channel, ChannelMsg, Sig};

use super::connection::Client;
use crate::transport::{CommandOutput, TransportError};

/// Buffer size for SSH command stdout
const SSH_CMD_BUFFER_SIZE: usize = 8192;

/// Buffer size for SSH command stderr
const SSH_RESPONSE_BUFFER_SIZE: usize = 1024;

/// SSH extended data type code for stderr.
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

impl Client {
    /// Get a new SSH channel for communication.
    pub async fn get_channel(&self) -> Result<Channel<Msg>, TransportError> {
        Ok(self.connection_handle.channel_open_session().await?)
    }

    /// Execute a remote command via the ssh connection.
    ///
    /// Every invocation is a new shell context, so `cd` and variables do not
    /// carry over. No PTY is requested and stdin is never written, so a
    /// command that waits for input simply runs into the command timeout.
    pub async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        let mut channel = self.get_channel().await?;
        channel.exec(true, command).await?;

        let mut collector = ExecCollector::default();
        while let Some(msg) = channel.wait().await {
            collector.handle(msg);
        }
        collector.finish()
    }
}

/// Accumulates the messages of one exec channel until it closes.
struct ExecCollector {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
    exit_signal: Option<String>,
}

impl Default for ExecCollector {
    fn default() -> Self {
        Self {
            stdout: Vec::with_capacity(SSH_CMD_BUFFER_SIZE),
            stderr: Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE),
            exit_status: None,
            exit_signal: None,
        }
    }
}

impl ExecCollector {
    fn handle(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { ref data } => self.stdout.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, ext } => {
                if ext == SSH_EXTENDED_DATA_STDERR {
                    self.stderr.extend_from_slice(data);
                }
            }

            // The exit status may arrive before the last data, so keep
            // reading until the channel closes.
            ChannelMsg::ExitStatus { exit_status } => self.exit_status = Some(exit_status),
            ChannelMsg::ExitSignal { signal_name, .. } => {
                self.exit_signal = Some(signal_label(&signal_name));
            }

            _ => {}
        }
    }

    fn finish(self) -> Result<CommandOutput, TransportError> {
        if self.exit_status.is_none() && self.exit_signal.is_none() {
            return Err(TransportError::ExitStatusMissing);
        }
        Ok(CommandOutput {
            output: self.stdout,
            stderr: self.stderr,
            exit_status: self.exit_status.unwrap_or_default(),
            exit_signal: self.exit_signal,
        })
    }
}

fn signal_label(sig: &Sig) -> String {
    match sig {
        Sig::Custom(name) => name.clone(),
        other => format!("{other:?}"),
    }
}
