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

//! Input validation applied before any connection is attempted.

use anyhow::{bail, Result};

const MAX_COMMAND_LENGTH: usize = 16384;
const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_USERNAME_LENGTH: usize = 32;

/// Reject commands the remote shell cannot receive intact.
///
/// Shell syntax is deliberately left alone: redirections, pipes and
/// substitutions are the caller's business.
pub fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        bail!("Empty command not allowed");
    }

    if command.len() > MAX_COMMAND_LENGTH {
        bail!(
            "Command too long: {} bytes (max: {} bytes)",
            command.len(),
            MAX_COMMAND_LENGTH
        );
    }

    if command.contains('\0') {
        bail!("Command contains null bytes");
    }

    Ok(())
}

/// Validate a hostname, IPv4 address, or bracketed IPv6 literal.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.trim().is_empty() {
        bail!("Empty hostname not allowed");
    }

    if hostname.len() > MAX_HOSTNAME_LENGTH {
        bail!(
            "Hostname too long: {} bytes (max: {} bytes)",
            hostname.len(),
            MAX_HOSTNAME_LENGTH
        );
    }

    if let Some(inner) = hostname
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            bail!("Invalid IPv6 address format: {}", hostname);
        }
        return Ok(());
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
    if !hostname.chars().all(valid_chars) {
        bail!("Invalid characters in hostname: {}", hostname);
    }

    if hostname.contains("..") {
        bail!("Double dots not allowed in hostname");
    }

    if hostname
        .split('.')
        .any(|segment| segment.starts_with('-') || segment.ends_with('-'))
    {
        bail!("Hostname segments cannot start or end with hyphen");
    }

    Ok(())
}

/// Validate a login name given as `user@host` or as the policy default.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        bail!("Empty username not allowed");
    }

    if username.len() > MAX_USERNAME_LENGTH {
        bail!(
            "Username too long: {} bytes (max: {} bytes)",
            username.len(),
            MAX_USERNAME_LENGTH
        );
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.';
    if !username.chars().all(valid_chars) {
        bail!("Invalid characters in username: {}", username);
    }

    if let Some(first_char) = username.chars().next() {
        if !first_char.is_ascii_alphabetic() && first_char != '_' {
            bail!("Username must start with letter or underscore");
        }
    }

    Ok(())
}
