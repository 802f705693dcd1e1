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

//! Public key authentication against an established handshake.
//!
//! Only non-interactive methods exist here. Password and keyboard-interactive
//! authentication would need a human at the terminal.

use russh::client::{Handle, Handler};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::transport::TransportError;

/// A credential offered to the server, in the order resolved by
/// [`AuthContext`](crate::ssh::auth::AuthContext).
#[derive(Clone)]
pub enum AuthMethod {
    /// An unencrypted private key already decoded from `path`.
    PrivateKey { path: PathBuf, key: Arc<PrivateKey> },
    /// Every identity held by the agent behind `SSH_AUTH_SOCK`.
    #[cfg(not(target_os = "windows"))]
    Agent,
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::PrivateKey { path, .. } => {
                f.debug_struct("PrivateKey").field("path", path).finish()
            }
            #[cfg(not(target_os = "windows"))]
            AuthMethod::Agent => f.write_str("Agent"),
        }
    }
}

/// Try each method in turn until the server accepts one.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    methods: &[AuthMethod],
) -> Result<(), TransportError> {
    for method in methods {
        if try_method(handle, username, method).await? {
            debug!(user = username, ?method, "Authenticated");
            return Ok(());
        }
        debug!(user = username, ?method, "Server rejected credential");
    }

    Err(TransportError::KeyAuthFailed {
        user: username.to_string(),
    })
}

async fn try_method<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    method: &AuthMethod,
) -> Result<bool, TransportError> {
    match method {
        AuthMethod::PrivateKey { key, .. } => {
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            let result = handle
                .authenticate_publickey(
                    username,
                    PrivateKeyWithHashAlg::new(Arc::clone(key), hash_alg),
                )
                .await?;
            Ok(result.success())
        }
        #[cfg(not(target_os = "windows"))]
        AuthMethod::Agent => {
            let mut agent = match russh::keys::agent::client::AgentClient::connect_env().await {
                Ok(agent) => agent,
                Err(e) => {
                    debug!("SSH agent unavailable: {e}");
                    return Ok(false);
                }
            };

            let identities = match agent.request_identities().await {
                Ok(identities) => identities,
                Err(e) => {
                    debug!("SSH agent did not list identities: {e}");
                    return Ok(false);
                }
            };

            for identity in identities {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                let result = handle
                    .authenticate_publickey_with(username, identity, hash_alg, &mut agent)
                    .await;

                if let Ok(auth_result) = result {
                    if auth_result.success() {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        }
    }
}
