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

use directories::BaseDirs;
use russh::keys::PublicKey;
use std::path::PathBuf;

use crate::policy::HostKeyPolicy;
use crate::transport::TransportError;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// Decides whether a server host key is trusted.
#[derive(Debug, Clone)]
pub struct HostKeyVerifier {
    policy: HostKeyPolicy,
    known_hosts: Option<PathBuf>,
}

impl HostKeyVerifier {
    pub fn new(policy: HostKeyPolicy) -> Self {
        Self {
            policy,
            known_hosts: get_default_known_hosts_path(),
        }
    }

    pub fn with_known_hosts(policy: HostKeyPolicy, path: PathBuf) -> Self {
        Self {
            policy,
            known_hosts: Some(path),
        }
    }

    /// Accept or refuse `key` for `host:port`.
    ///
    /// A refusal is an error rather than `Ok(false)` so that the reason
    /// reaches the caller instead of a bare handshake failure.
    pub fn verify(&self, host: &str, port: u16, key: &PublicKey) -> Result<bool, TransportError> {
        if self.policy == HostKeyPolicy::Off {
            return Ok(true);
        }

        let Some(path) = &self.known_hosts else {
            return match self.policy {
                HostKeyPolicy::Strict => Err(TransportError::HostKeyUnknown {
                    host: host.to_string(),
                }),
                _ => {
                    tracing::warn!("Could not determine known_hosts path, accepting key for {host}");
                    Ok(true)
                }
            };
        };

        match russh::keys::check_known_hosts_path(host, port, key, path) {
            Ok(true) => Ok(true),
            Ok(false) if self.policy == HostKeyPolicy::Strict => {
                Err(TransportError::HostKeyUnknown {
                    host: host.to_string(),
                })
            }
            Ok(false) => {
                match russh::keys::known_hosts::learn_known_hosts_path(host, port, key, path) {
                    Ok(()) => tracing::debug!("Recorded new host key for {host} in {:?}", path),
                    Err(e) => tracing::warn!("Could not record host key for {host}: {e}"),
                }
                Ok(true)
            }
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: host.to_string(),
                line,
            }),
            Err(e) => Err(TransportError::Key(e)),
        }
    }
}
