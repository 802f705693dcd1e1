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

use russh::client::Config;
use std::sync::Arc;
use tracing::debug;

use super::authentication::AuthMethod;
use super::connection::{Client, ClientHandler};
use crate::ssh::known_hosts::HostKeyVerifier;
use crate::transport::TransportError;

impl Client {
    /// Reach `hostname:port` through this connection used as a gateway.
    ///
    /// Opens a `direct-tcpip` channel from the gateway to the destination and
    /// runs a second SSH session over it. The gateway client must outlive the
    /// returned one.
    pub async fn connect_via(
        &self,
        hostname: &str,
        port: u16,
        username: &str,
        methods: &[AuthMethod],
        verifier: Arc<HostKeyVerifier>,
        config: Arc<Config>,
    ) -> Result<Client, TransportError> {
        debug!(
            gateway = %self.hostname,
            "Opening tunnel to {hostname}:{port}"
        );

        let channel = self
            .connection_handle
            .channel_open_direct_tcpip(hostname, u32::from(port), "127.0.0.1", 0)
            .await
            .map_err(|e| TransportError::Unreachable {
                host: format!("{hostname}:{port}"),
                reason: format!("gateway {} could not open tunnel: {e}", self.hostname),
            })?;

        let stream = channel.into_stream();
        let handler = ClientHandler::new(hostname.to_string(), port, verifier);
        let handle = russh::client::connect_stream(config, stream, handler).await?;

        Client::from_tunneled_handle(handle, hostname, port, username, methods).await
    }
}
