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

use headless_ssh::{ConfigError, HostKeyPolicy, RemoteSession, SessionPolicy};
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_policy_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("policy.yaml");
    std::fs::write(
        &path,
        r#"
connection_attempts: 5
command_timeout: 30
network_timeout: 10
key_file: /etc/deploy/id_ed25519
gateway: jump@bastion.example.com:2222
user: deploy
host_key_policy: off
retry_delay_ms: 250
"#,
    )
    .unwrap();

    let policy = SessionPolicy::load(&path).unwrap();
    assert_eq!(policy.connection_attempts(), 5);
    assert_eq!(policy.command_timeout(), Duration::from_secs(30));
    assert_eq!(policy.network_timeout(), Duration::from_secs(10));
    assert_eq!(
        policy.key_file(),
        Some(PathBuf::from("/etc/deploy/id_ed25519").as_path())
    );
    assert_eq!(policy.gateway().unwrap().user.as_deref(), Some("jump"));
    assert_eq!(policy.user(), Some("deploy"));
    assert_eq!(policy.host_key_policy(), HostKeyPolicy::Off);
    assert_eq!(policy.retry_delay(), Duration::from_millis(250));

    assert!(RemoteSession::new(policy).is_ok());
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = SessionPolicy::load(temp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_empty_document_gives_defaults() {
    let policy = SessionPolicy::from_yaml_str("{}").unwrap();
    assert_eq!(policy, SessionPolicy::default());
}

#[test]
fn test_invalid_policy_file_values() {
    assert!(matches!(
        SessionPolicy::from_yaml_str("connection_attempts: 0"),
        Err(ConfigError::NotPositive {
            field: "connection_attempts"
        })
    ));
    assert!(matches!(
        SessionPolicy::from_yaml_str("host_key_policy: maybe"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        SessionPolicy::from_yaml_str("gateway: 'bad host'"),
        Err(ConfigError::InvalidGateway { .. })
    ));
}

#[test]
#[serial]
fn test_tilde_key_path_expands_to_home() {
    let temp_dir = TempDir::new().unwrap();
    let original_home = std::env::var_os("HOME");
    std::env::set_var("HOME", temp_dir.path());

    let policy = SessionPolicy::from_yaml_str("key_file: ~/.ssh/deploy").unwrap();

    match original_home {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }

    assert_eq!(
        policy.key_file().unwrap(),
        temp_dir.path().join(".ssh/deploy")
    );
}
