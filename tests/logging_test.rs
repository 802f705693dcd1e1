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

mod common;

use common::{fast_policy, Behavior, ScriptedTransport};
use headless_ssh::RemoteSession;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

// current_thread runtime: the per-host tasks run on this thread and see the
// thread-local subscriber.
#[tokio::test]
async fn test_failed_host_is_logged_at_warn() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let transport = ScriptedTransport::new([
        ("web1", Behavior::ok("fine\n")),
        ("web2", Behavior::Refuse),
    ]);
    let session = RemoteSession::with_transport(fast_policy(1), transport);
    let report = session.execute_on_hosts("ls", ["web1", "web2"]).await.unwrap();
    assert_eq!(report.failures().count(), 1);

    let text = logs.text();
    let line = text
        .lines()
        .find(|line| line.contains("host=web2"))
        .unwrap_or_else(|| panic!("no log line for web2 in:\n{text}"));
    assert!(line.contains("WARN"), "{line}");
    assert!(line.contains("kind=connection-failure"), "{line}");
    assert!(line.contains("target=command 'ls'"), "{line}");
    assert!(!text.contains("host=web1"), "{text}");
}
