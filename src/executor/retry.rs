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

//! Bounded connection attempts with exponential backoff.

use std::time::Duration;
use tracing::debug;

use crate::host::HostId;
use crate::policy::SessionPolicy;
use crate::transport::{ConnectOptions, Transport, TransportError};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_policy(policy: &SessionPolicy) -> Self {
        Self {
            attempts: policy.connection_attempts(),
            base_delay: policy.retry_delay(),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

/// Connect to `host`, trying up to `retry.attempts` times.
///
/// Each attempt is bounded by `options.network_timeout`. Errors that need
/// user interaction end the loop at once.
pub async fn connect_with_retry<T: Transport>(
    transport: &T,
    host: &HostId,
    options: &ConnectOptions,
    retry: &RetryPolicy,
) -> Result<T::Connection, TransportError> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!(host = %host, attempt, attempts, "Connecting");

        let result = match tokio::time::timeout(
            options.network_timeout,
            transport.connect(host, options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(options.network_timeout)),
        };

        let err = match result {
            Ok(connection) => return Ok(connection),
            Err(err) => err,
        };

        if !err.is_transient() {
            debug!(host = %host, attempt, "Not retrying: {err}");
            return Err(err);
        }
        if attempt >= attempts {
            debug!(host = %host, attempt, "Giving up: {err}");
            return Err(err);
        }

        let delay = retry.delay_after(attempt);
        debug!(host = %host, attempt, ?delay, "Connection attempt failed: {err}");
        tokio::time::sleep(delay).await;
    }
}
