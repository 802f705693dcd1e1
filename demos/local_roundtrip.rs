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

//! Run a command on localhost, write its output to a remote file, and fetch
//! that file back.
//!
//! Requires key-based SSH access to localhost; password and passphrase
//! prompts are disabled.
//!
//! ```text
//! cargo run --example local_roundtrip
//! ```

use anyhow::{Context, Result};
use headless_ssh::utils::init_logging;
use headless_ssh::{RemoteSession, SessionPolicy};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(1);

    println!("Initializing session...");
    println!("\tMaximum number of connection attempts to remote host: 3");
    println!("\tCommand timeout (in seconds): 120");
    println!("\tNetwork timeout (in seconds): 120");
    let policy = SessionPolicy::builder()
        .connection_attempts(3)
        .command_timeout(Duration::from_secs(120))
        .network_timeout(Duration::from_secs(120))
        .build()?;
    let session = RemoteSession::new(policy)?;

    println!("Executing 'ls' on localhost");
    let report = session.execute_on_hosts("ls", ["localhost"]).await?;
    for (host, outcome) in report.iter() {
        match outcome {
            Ok(result) => print!("[{host}]\n{}", result.stdout_string()),
            Err(e) => println!("[{host}] {e}"),
        }
    }

    println!("\nExecuting 'ls >example.out' on localhost");
    let report = session
        .execute_on_hosts("ls >example.out", ["localhost"])
        .await?;
    if let Some(Err(e)) = report.get("localhost") {
        return Err(e.clone()).context("remote command failed");
    }

    println!("\nDownloading 'example.out' to 'local_example.out'");
    let result = session
        .fetch_file("localhost", "example.out", "local_example.out")
        .await
        .context("download failed")?;
    if let Some(status) = result.transfer {
        println!("\t{} bytes", status.bytes);
    }

    println!("\nSuccess! (You may want to delete those example files.)");
    Ok(())
}
