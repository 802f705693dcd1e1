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

//! Headless resolution of SSH credentials.
//!
//! Anything an interactive client would have prompted for (a key passphrase,
//! a password because no key exists) is reported as
//! [`TransportError::InteractionRequired`] instead.

use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

use super::tokio_client::AuthMethod;
use crate::transport::TransportError;

/// Default identities, in the order they are offered.
const DEFAULT_KEY_NAMES: &[&str] = &["id_ed25519", "id_ecdsa", "id_rsa"];

/// Inputs for choosing which credentials to offer.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Explicit key. Disables the agent and default key discovery.
    pub key_path: Option<PathBuf>,
    pub username: String,
    pub host: String,
}

impl AuthContext {
    pub fn new(username: String, host: String) -> Self {
        Self {
            key_path: None,
            username,
            host,
        }
    }

    pub fn with_key_path(mut self, key_path: Option<PathBuf>) -> Self {
        self.key_path = key_path;
        self
    }

    /// Resolve the ordered list of credentials to offer.
    ///
    /// With an explicit key, that key alone. Otherwise the agent (when
    /// `SSH_AUTH_SOCK` is set) followed by every unencrypted default key.
    pub fn determine_methods(&self) -> Result<Vec<AuthMethod>, TransportError> {
        if let Some(key_path) = &self.key_path {
            return Ok(vec![load_key(key_path)?]);
        }

        let mut methods = Vec::new();

        #[cfg(not(target_os = "windows"))]
        if std::env::var_os("SSH_AUTH_SOCK").is_some() {
            debug!("Offering SSH agent identities");
            methods.push(AuthMethod::Agent);
        }

        for path in default_key_paths() {
            if !path.exists() {
                continue;
            }
            match load_key(&path) {
                Ok(method) => {
                    debug!("Offering default key: {:?}", path);
                    methods.push(method);
                }
                Err(e) => debug!("Skipping default key {:?}: {e}", path),
            }
        }

        if methods.is_empty() {
            return Err(TransportError::InteractionRequired(format!(
                "no SSH agent and no usable default key for {}@{}; a password would be required",
                self.username, self.host
            )));
        }
        Ok(methods)
    }
}

fn default_key_paths() -> Vec<PathBuf> {
    let Some(dirs) = BaseDirs::new() else {
        return Vec::new();
    };
    let ssh_dir = dirs.home_dir().join(".ssh");
    DEFAULT_KEY_NAMES
        .iter()
        .map(|name| ssh_dir.join(name))
        .collect()
}

/// Read and decode an unencrypted private key.
fn load_key(path: &Path) -> Result<AuthMethod, TransportError> {
    let contents = std::fs::read_to_string(path).map(Zeroizing::new).map_err(|e| {
        TransportError::InteractionRequired(format!("cannot read key file {path:?}: {e}"))
    })?;

    match russh::keys::decode_secret_key(&contents, None) {
        Ok(key) => Ok(AuthMethod::PrivateKey {
            path: path.to_path_buf(),
            key: Arc::new(key),
        }),
        Err(russh::keys::Error::KeyIsEncrypted) => Err(TransportError::InteractionRequired(
            format!("key file {path:?} is encrypted and a passphrase would be required"),
        )),
        Err(e) => Err(TransportError::Key(e)),
    }
}
