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

use tracing::Level;
use tracing_subscriber::filter::{filter_fn, FilterFn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::executor::context::is_quiet;

/// Targets whose diagnostics are silenced inside a quiet scope.
const TRANSPORT_TARGETS: &[&str] = &["russh", "russh_sftp", "headless_ssh::ssh"];

/// Create an environment filter based on verbosity level
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        // Use RUST_LOG if set (allows debugging russh and other dependencies)
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            // russh logs from its own session task, outside any quiet scope,
            // so only its errors are let through by default.
            0 => EnvFilter::new("headless_ssh=warn,russh=error,russh_sftp=error"),
            1 => EnvFilter::new("headless_ssh=info,russh=error,russh_sftp=error"),
            2 => EnvFilter::new("headless_ssh=debug,russh=debug"),
            _ => EnvFilter::new("headless_ssh=trace,russh=trace,russh_sftp=debug"),
        }
    }
}

/// Drop non-error transport events emitted from a task running under
/// [`quiet`](crate::executor::context::quiet).
///
/// Only events raised on the quiet task itself are affected; russh's own
/// background session tasks are governed by the env filter alone.
pub fn quiet_filter() -> FilterFn<impl Fn(&tracing::Metadata<'_>) -> bool> {
    filter_fn(|metadata| {
        if !is_quiet() || *metadata.level() == Level::ERROR {
            return true;
        }
        !is_transport_target(metadata.target())
    })
}

fn is_transport_target(target: &str) -> bool {
    TRANSPORT_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Install a console subscriber honoring `RUST_LOG` and quiet scopes.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(verbosity: u8) {
    let filter = create_env_filter(verbosity);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(quiet_filter()),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_create_env_filter() {
        let saved = std::env::var_os("RUST_LOG");
        std::env::remove_var("RUST_LOG");

        for verbosity in [0, 1] {
            let filter = create_env_filter(verbosity).to_string();
            assert!(filter.contains("russh=error"), "{filter}");
            assert!(filter.contains("russh_sftp=error"), "{filter}");
        }
        assert!(create_env_filter(2).to_string().contains("russh=debug"));
        assert!(create_env_filter(3).to_string().contains("russh=trace"));

        if let Some(value) = saved {
            std::env::set_var("RUST_LOG", value);
        }
    }

    #[test]
    fn test_transport_target_matching() {
        assert!(is_transport_target("russh"));
        assert!(is_transport_target("russh::client"));
        assert!(is_transport_target("russh_sftp::client"));
        assert!(is_transport_target("headless_ssh::ssh::tokio_client"));

        assert!(!is_transport_target("russh_keys_extra"));
        assert!(!is_transport_target("headless_ssh::executor::guard"));
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(0);
        init_logging(1);
    }
}
