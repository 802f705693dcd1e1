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

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::auth::AuthContext;
use super::known_hosts::HostKeyVerifier;
use super::tokio_client::{AuthMethod, Client, Config};
use crate::error::ConfigError;
use crate::executor::{TransferDirection, TransferStatus};
use crate::host::HostId;
use crate::policy::SessionPolicy;
use crate::transport::{CommandOutput, ConnectOptions, Connection, Transport, TransportError};

/// [`Transport`] backed by russh.
#[derive(Clone)]
pub struct SshTransport {
    config: Arc<Config>,
}

impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport").finish_non_exhaustive()
    }
}

impl SshTransport {
    /// Check that `policy` is usable by this transport. No network I/O.
    ///
    /// A key file that does not exist yet is accepted here; connecting with
    /// it later is reported as a prompt-required failure.
    pub fn new(policy: &SessionPolicy) -> Result<Self, ConfigError> {
        if let Some(key_file) = policy.key_file() {
            if key_file.is_dir() {
                return Err(ConfigError::Transport(format!(
                    "key file {key_file:?} is a directory"
                )));
            }
        }

        Ok(Self {
            config: Arc::new(Config::default()),
        })
    }

    fn auth_methods(
        &self,
        username: &str,
        host: &str,
        options: &ConnectOptions,
    ) -> Result<Vec<AuthMethod>, TransportError> {
        AuthContext::new(username.to_string(), host.to_string())
            .with_key_path(options.key_file.clone())
            .determine_methods()
    }
}

#[async_trait]
impl Transport for SshTransport {
    type Connection = SshConnection;

    async fn connect(
        &self,
        host: &HostId,
        options: &ConnectOptions,
    ) -> Result<SshConnection, TransportError> {
        let verifier = Arc::new(HostKeyVerifier::new(options.host_key_policy));
        let methods = self.auth_methods(&options.user, &host.host, options)?;

        let Some(gateway) = &options.gateway else {
            debug!(host = %host, user = %options.user, "Connecting directly");
            let client = Client::connect(
                &host.host,
                host.port,
                &options.user,
                &methods,
                verifier,
                Arc::clone(&self.config),
            )
            .await?;
            return Ok(SshConnection {
                client,
                gateway: None,
            });
        };

        let gateway_user = gateway.effective_user(Some(&options.user));
        let gateway_methods = self.auth_methods(&gateway_user, &gateway.host, options)?;
        debug!(host = %host, gateway = %gateway, "Connecting through gateway");

        let gateway_client = Client::connect(
            &gateway.host,
            gateway.port,
            &gateway_user,
            &gateway_methods,
            Arc::clone(&verifier),
            Arc::clone(&self.config),
        )
        .await?;

        let client = match gateway_client
            .connect_via(
                &host.host,
                host.port,
                &options.user,
                &methods,
                verifier,
                Arc::clone(&self.config),
            )
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let _ = gateway_client.disconnect().await;
                return Err(e);
            }
        };

        Ok(SshConnection {
            client,
            gateway: Some(gateway_client),
        })
    }
}

/// One authenticated session, plus the gateway session it tunnels through.
#[derive(Debug)]
pub struct SshConnection {
    client: Client,
    gateway: Option<Client>,
}

#[async_trait]
impl Connection for SshConnection {
    async fn run_command(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        debug!(user = self.client.get_connection_username(), "Executing command");
        self.client.execute(command).await
    }

    async fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<TransferStatus, TransportError> {
        let bytes = self.client.upload_file(local_path, remote_path).await?;
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
        let bytes = self.client.download_file(remote_path, local_path).await?;
        Ok(TransferStatus {
            direction: TransferDirection::Download,
            source: remote_path.to_string(),
            destination: local_path.display().to_string(),
            bytes,
        })
    }

    async fn close(&mut self) {
        if !self.client.is_closed() {
            if let Err(e) = self.client.disconnect().await {
                debug!("Disconnect failed: {e}");
            }
        }
        if let Some(gateway) = &self.gateway {
            if let Err(e) = gateway.disconnect().await {
                debug!("Gateway disconnect failed: {e}");
            }
        }
    }
}
