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

//! Single-file SFTP transfers.
//!
//! The remote sshd must expose the `sftp` subsystem
//! (`Subsystem sftp internal-sftp` or the sftp-server binary).

use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::connection::Client;
use crate::transport::TransportError;

impl Client {
    async fn open_sftp(&self) -> Result<SftpSession, TransportError> {
        let channel = self.get_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }

    /// Upload a local file, replacing the remote file if it exists.
    /// Returns the number of bytes written.
    pub async fn upload_file(
        &self,
        src_file_path: &Path,
        dest_file_path: &str,
    ) -> Result<u64, TransportError> {
        let file_contents = tokio::fs::read(src_file_path).await?;

        let sftp = self.open_sftp().await?;
        let mut file = sftp
            .open_with_flags(
                dest_file_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| TransportError::RemoteFile {
                path: dest_file_path.to_string(),
                reason: e.to_string(),
            })?;
        file.write_all(&file_contents).await?;
        file.flush().await?;
        file.shutdown().await?;

        Ok(file_contents.len() as u64)
    }

    /// Download a remote file, replacing the local file if it exists.
    /// Returns the number of bytes written.
    pub async fn download_file(
        &self,
        remote_file_path: &str,
        local_file_path: &Path,
    ) -> Result<u64, TransportError> {
        let sftp = self.open_sftp().await?;
        let mut remote_file = sftp
            .open_with_flags(remote_file_path, OpenFlags::READ)
            .await
            .map_err(|e| TransportError::RemoteFile {
                path: remote_file_path.to_string(),
                reason: e.to_string(),
            })?;

        let mut contents = Vec::new();
        remote_file.read_to_end(&mut contents).await?;

        let mut local_file = tokio::fs::File::create(local_file_path).await?;
        local_file.write_all(&contents).await?;
        local_file.flush().await?;

        Ok(contents.len() as u64)
    }
}
