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

//! SSH connection establishment.
//!
//! Opens the TCP connection, runs the handshake with host key verification
//! through [`ClientHandler`], then authenticates with the resolved methods.

use russh::client::{Config, Handle, Handler};
use std::fmt::Debug;
use std::sync::Arc;

use super::authentication::{authenticate, AuthMethod};
use crate::ssh::known_hosts::HostKeyVerifier;
use crate::transport::TransportError;

/// An authenticated SSH connection to one host.
pub struct Client {
    pub(super) connection_handle: Handle<ClientHandler>,
    pub(super) username: String,
    pub(super) hostname: String,
    pub(super) port: u16,
}

impl Client {
    /// Open a direct TCP connection to `hostname:port` and authenticate.
    pub async fn connect(
        hostname: &str,
        port: u16,
        username: &str,
        methods: &[AuthMethod],
        verifier: Arc<HostKeyVerifier>,
        config: Arc<Config>,
    ) -> Result<Self, TransportError> {
        let handler = ClientHandler::new(hostname.to_string(), port, verifier);
        let mut handle = russh::client::connect(config, (hostname, port), handler).await?;

        authenticate(&mut handle, username, methods).await?;

        Ok(Self {
            connection_handle: handle,
            username: username.to_string(),
            hostname: hostname.to_string(),
            port,
        })
    }

    /// Wrap a handle whose handshake ran over a tunnel, then authenticate.
    pub(super) async fn from_tunneled_handle(
        mut handle: Handle<ClientHandler>,
        hostname: &str,
        port: u16,
        username: &str,
        methods: &[AuthMethod],
    ) -> Result<Self, TransportError> {
        authenticate(&mut handle, username, methods).await?;

        Ok(Self {
            connection_handle: handle,
            username: username.to_string(),
            hostname: hostname.to_string(),
            port,
        })
    }

    pub fn get_connection_username(&self) -> &str {
        &self.username
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    verifier: Arc<HostKeyVerifier>,
}

impl ClientHandler {
    pub fn new(hostname: String, port: u16, verifier: Arc<HostKeyVerifier>) -> Self {
        Self {
            hostname,
            port,
            verifier,
        }
    }
}

impl Handler for ClientHandler {
    type Error = TransportError;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        self.verifier
            .verify(&self.hostname, self.port, server_public_key)
    }
}
