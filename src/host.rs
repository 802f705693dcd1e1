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

//! Host identifiers and per-call host lists.

use anyhow::{Context, Result};
use std::fmt;

use crate::utils::sanitize::{validate_hostname, validate_username};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// A parsed target host.
///
/// `label` is the identifier exactly as the caller wrote it; results and
/// errors are keyed by it so callers can look them up with their own string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostId {
    pub label: String,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
}

impl HostId {
    /// Parse `host`, `host:port`, `user@host`, `user@host:port`, or a
    /// bracketed IPv6 literal such as `[::1]:2222`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (user, host_part) = match spec.rfind('@') {
            Some(at_pos) => {
                let user = &spec[..at_pos];
                validate_username(user)?;
                (Some(user.to_string()), &spec[at_pos + 1..])
            }
            None => (None, spec),
        };

        let (host, port) = if let Some(rest) = host_part.strip_prefix('[') {
            let close = rest
                .find(']')
                .with_context(|| format!("Unclosed IPv6 bracket in '{spec}'"))?;
            let host = &rest[..close];
            let after = &rest[close + 1..];
            let port = match after.strip_prefix(':') {
                Some(port_str) => parse_port(port_str)?,
                None if after.is_empty() => DEFAULT_SSH_PORT,
                None => anyhow::bail!("Unexpected characters after IPv6 address in '{spec}'"),
            };
            validate_hostname(&format!("[{host}]"))?;
            (host.to_string(), port)
        } else if let Some(colon_pos) = host_part.rfind(':') {
            let host = &host_part[..colon_pos];
            let port = parse_port(&host_part[colon_pos + 1..])?;
            validate_hostname(host)?;
            (host.to_string(), port)
        } else {
            validate_hostname(host_part)?;
            (host_part.to_string(), DEFAULT_SSH_PORT)
        };

        Ok(Self {
            label: spec.to_string(),
            host,
            port,
            user,
        })
    }

    /// Login name for this host: explicit `user@`, then the policy default,
    /// then the local account name.
    pub fn effective_user(&self, default_user: Option<&str>) -> String {
        self.user
            .as_deref()
            .or(default_user)
            .map(str::to_string)
            .unwrap_or_else(local_username)
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn parse_port(port_str: &str) -> Result<u16> {
    let port = port_str
        .parse::<u16>()
        .with_context(|| format!("Invalid port number '{port_str}'"))?;
    if port == 0 {
        anyhow::bail!("Port 0 is not a valid SSH port");
    }
    Ok(port)
}

fn local_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "root".to_string())
}

/// Hosts for a single operation call, in caller order.
///
/// Duplicates are dropped on construction, keeping the first occurrence.
/// The number of hosts the caller passed is kept alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostList {
    hosts: Vec<String>,
    requested: usize,
}

impl HostList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        let mut requested = 0;
        for host in hosts {
            requested += 1;
            let host = host.into();
            if !deduped.contains(&host) {
                deduped.push(host);
            }
        }
        Self {
            hosts: deduped,
            requested,
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Number of hosts as passed by the caller, duplicates included.
    pub fn requested_len(&self) -> usize {
        self.requested
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// The only host, if the caller passed exactly one.
    ///
    /// A host repeated twice is two hosts here, even though it runs once.
    pub fn single(&self) -> Option<&str> {
        match self.hosts.as_slice() {
            [host] if self.requested == 1 => Some(host.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for HostList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.hosts.join(", "))
    }
}

impl From<&str> for HostList {
    fn from(host: &str) -> Self {
        Self::new([host])
    }
}

impl From<String> for HostList {
    fn from(host: String) -> Self {
        Self::new([host])
    }
}

impl From<&String> for HostList {
    fn from(host: &String) -> Self {
        Self::new([host.as_str()])
    }
}

impl From<Vec<String>> for HostList {
    fn from(hosts: Vec<String>) -> Self {
        Self::new(hosts)
    }
}

impl From<Vec<&str>> for HostList {
    fn from(hosts: Vec<&str>) -> Self {
        Self::new(hosts)
    }
}

impl From<&[&str]> for HostList {
    fn from(hosts: &[&str]) -> Self {
        Self::new(hosts.iter().copied())
    }
}

impl From<&[String]> for HostList {
    fn from(hosts: &[String]) -> Self {
        Self::new(hosts.iter().cloned())
    }
}

impl<const N: usize> From<[&str; N]> for HostList {
    fn from(hosts: [&str; N]) -> Self {
        Self::new(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_only() {
        let host = HostId::parse("example.com").unwrap();
        assert_eq!(host.host, "example.com");
        assert_eq!(host.port, 22);
        assert_eq!(host.user, None);
        assert_eq!(host.label, "example.com");
    }

    #[test]
    fn test_parse_host_with_port() {
        let host = HostId::parse("example.com:2222").unwrap();
        assert_eq!(host.host, "example.com");
        assert_eq!(host.port, 2222);
    }

    #[test]
    fn test_parse_full_format() {
        let host = HostId::parse("deploy@example.com:2222").unwrap();
        assert_eq!(host.user.as_deref(), Some("deploy"));
        assert_eq!(host.host, "example.com");
        assert_eq!(host.port, 2222);
        assert_eq!(host.label, "deploy@example.com:2222");
    }

    #[test]
    fn test_parse_ipv6() {
        let host = HostId::parse("[::1]:2200").unwrap();
        assert_eq!(host.host, "::1");
        assert_eq!(host.port, 2200);

        let host = HostId::parse("[fe80::1]").unwrap();
        assert_eq!(host.host, "fe80::1");
        assert_eq!(host.port, 22);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(HostId::parse("").is_err());
        assert!(HostId::parse("example.com:notaport").is_err());
        assert!(HostId::parse("example.com:0").is_err());
        assert!(HostId::parse("bad host").is_err());
        assert!(HostId::parse("a,b").is_err());
        assert!(HostId::parse("[::1").is_err());
    }

    #[test]
    fn test_effective_user_precedence() {
        let explicit = HostId::parse("admin@example.com").unwrap();
        assert_eq!(explicit.effective_user(Some("ops")), "admin");

        let implicit = HostId::parse("example.com").unwrap();
        assert_eq!(implicit.effective_user(Some("ops")), "ops");
    }

    #[test]
    fn test_host_list_dedups_in_order() {
        let list = HostList::from(vec!["b", "a", "b", "c", "a"]);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.requested_len(), 5);
    }

    #[test]
    fn test_host_list_single() {
        assert_eq!(HostList::from("localhost").single(), Some("localhost"));
        assert_eq!(HostList::from(vec!["a", "b"]).single(), None);
        assert_eq!(HostList::default().single(), None);
        assert_eq!(HostList::from(vec!["a", "a"]).single(), None);
        assert!(HostList::from(Vec::<String>::new()).is_empty());
    }
}
