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

//! Task-local state for a single operation call.
//!
//! Each per-host worker runs inside its own scope, so the host list and
//! target of one call are never visible to another call or to a later one.

use std::future::Future;
use std::sync::Arc;

use crate::error::OperationTarget;
use crate::host::HostList;

/// What the current task is working on.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Monotonic id of the session call this task belongs to.
    pub call_id: u64,
    /// Hosts requested by this call.
    pub hosts: Arc<HostList>,
    /// Host this task is working on.
    pub host: String,
    pub target: OperationTarget,
}

tokio::task_local! {
    static CALL_CONTEXT: CallContext;
    static QUIET: bool;
}

/// Run `fut` with `ctx` bound as the current call context.
pub async fn with_context<F: Future>(ctx: CallContext, fut: F) -> F::Output {
    CALL_CONTEXT.scope(ctx, fut).await
}

/// Context of the current task, if it runs inside [`with_context`].
pub fn current() -> Option<CallContext> {
    CALL_CONTEXT.try_with(Clone::clone).ok()
}

/// Run `fut` with transport diagnostics suppressed.
pub async fn quiet<F: Future>(fut: F) -> F::Output {
    QUIET.scope(true, fut).await
}

pub fn is_quiet() -> bool {
    QUIET.try_with(|q| *q).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(call_id: u64, host: &str) -> CallContext {
        CallContext {
            call_id,
            hosts: Arc::new(HostList::from(host)),
            host: host.to_string(),
            target: OperationTarget::command("true"),
        }
    }

    #[tokio::test]
    async fn test_context_is_scoped() {
        assert!(current().is_none());

        let seen = with_context(ctx(1, "web1"), async { current().map(|c| c.host) }).await;
        assert_eq!(seen.as_deref(), Some("web1"));

        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_context_does_not_leak_into_spawned_tasks() {
        let leaked = with_context(ctx(7, "web1"), async {
            tokio::spawn(async { current().is_some() }).await.unwrap()
        })
        .await;
        assert!(!leaked);
    }

    #[tokio::test]
    async fn test_quiet_scope() {
        assert!(!is_quiet());
        assert!(quiet(async { is_quiet() }).await);
        assert!(!is_quiet());
    }
}
