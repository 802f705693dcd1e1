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

//! Immutable session policy.
//!
//! A [`SessionPolicy`] is fixed when a session is built and shared read-only
//! by every operation afterwards. It can be assembled in code through
//! [`SessionPolicyBuilder`] or loaded from a YAML document:
//!
//! ```yaml
//! connection_attempts: 3
//! command_timeout: 120
//! network_timeout: 30
//! key_file: ~/.ssh/deploy_ed25519
//! gateway: bastion.example.com
//! host_key_policy: strict
//! ```

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::host::HostId;
use crate::utils::sanitize::validate_username;

pub const DEFAULT_CONNECTION_ATTEMPTS: u32 = 3;
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How server host keys are checked against `~/.ssh/known_hosts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Unknown hosts are refused.
    Strict,
    /// Unknown hosts are recorded on first contact; changed keys are refused.
    #[default]
    AcceptNew,
    /// No host key verification.
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    connection_attempts: u32,
    command_timeout: Duration,
    network_timeout: Duration,
    key_file: Option<PathBuf>,
    gateway: Option<HostId>,
    user: Option<String>,
    host_key_policy: HostKeyPolicy,
    retry_delay: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            connection_attempts: DEFAULT_CONNECTION_ATTEMPTS,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            key_file: None,
            gateway: None,
            user: None,
            host_key_policy: HostKeyPolicy::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl SessionPolicy {
    pub fn builder() -> SessionPolicyBuilder {
        SessionPolicyBuilder::default()
    }

    /// Parse a YAML policy document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: PolicyFile = serde_yaml::from_str(yaml)?;
        file.into_builder().build()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = expand_tilde(path.as_ref());
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn connection_attempts(&self) -> u32 {
        self.connection_attempts
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn network_timeout(&self) -> Duration {
        self.network_timeout
    }

    /// Explicit key. When set, default key discovery and the agent are skipped.
    pub fn key_file(&self) -> Option<&Path> {
        self.key_file.as_deref()
    }

    pub fn gateway(&self) -> Option<&HostId> {
        self.gateway.as_ref()
    }

    /// Default login name for hosts given without `user@`.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn host_key_policy(&self) -> HostKeyPolicy {
        self.host_key_policy
    }

    /// Base delay between connection attempts, doubled after each failure.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

/// Builder for [`SessionPolicy`]; [`build`](Self::build) validates every field.
#[derive(Debug, Clone, Default)]
pub struct SessionPolicyBuilder {
    connection_attempts: Option<u32>,
    command_timeout: Option<Duration>,
    network_timeout: Option<Duration>,
    key_file: Option<PathBuf>,
    gateway: Option<String>,
    user: Option<String>,
    host_key_policy: Option<HostKeyPolicy>,
    retry_delay: Option<Duration>,
}

impl SessionPolicyBuilder {
    pub fn connection_attempts(mut self, attempts: u32) -> Self {
        self.connection_attempts = Some(attempts);
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    pub fn gateway(mut self, host: impl Into<String>) -> Self {
        self.gateway = Some(host.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = Some(policy);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn build(self) -> Result<SessionPolicy, ConfigError> {
        let connection_attempts = self
            .connection_attempts
            .unwrap_or(DEFAULT_CONNECTION_ATTEMPTS);
        if connection_attempts == 0 {
            return Err(ConfigError::NotPositive {
                field: "connection_attempts",
            });
        }

        let command_timeout = self.command_timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT);
        if command_timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "command_timeout",
            });
        }

        let network_timeout = self.network_timeout.unwrap_or(DEFAULT_NETWORK_TIMEOUT);
        if network_timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "network_timeout",
            });
        }

        let key_file = match self.key_file {
            Some(path) if path.as_os_str().is_empty() => return Err(ConfigError::EmptyKeyFile),
            Some(path) => Some(expand_tilde(&path)),
            None => None,
        };

        let gateway = self
            .gateway
            .map(|spec| {
                HostId::parse(&spec).map_err(|e| ConfigError::InvalidGateway {
                    host: spec.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        if let Some(user) = &self.user {
            validate_username(user).map_err(|_| ConfigError::InvalidUser { user: user.clone() })?;
        }

        Ok(SessionPolicy {
            connection_attempts,
            command_timeout,
            network_timeout,
            key_file,
            gateway,
            user: self.user,
            host_key_policy: self.host_key_policy.unwrap_or_default(),
            retry_delay: self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
        })
    }
}

/// On-disk policy layout. Durations are whole seconds except `retry_delay_ms`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PolicyFile {
    connection_attempts: Option<u32>,
    command_timeout: Option<u64>,
    network_timeout: Option<u64>,
    key_file: Option<PathBuf>,
    gateway: Option<String>,
    user: Option<String>,
    host_key_policy: Option<HostKeyPolicy>,
    retry_delay_ms: Option<u64>,
}

impl PolicyFile {
    fn into_builder(self) -> SessionPolicyBuilder {
        SessionPolicyBuilder {
            connection_attempts: self.connection_attempts,
            command_timeout: self.command_timeout.map(Duration::from_secs),
            network_timeout: self.network_timeout.map(Duration::from_secs),
            key_file: self.key_file,
            gateway: self.gateway,
            user: self.user,
            host_key_policy: self.host_key_policy,
            retry_delay: self.retry_delay_ms.map(Duration::from_millis),
        }
    }
}

/// Expand a leading `~/` to the current user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    path.to_path_buf()
}
