// pahe-dl - AnimePahe stream resolver and downloader
// Copyright (C) 2025 pahe-dl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Direct single-file retrieval
//!
//! For locators that already point at a complete media file. The body is
//! streamed through a 1 MiB write buffer into a temporary sibling, then
//! atomically renamed into place. A failure at any point removes the temp
//! file before the error surfaces, so nothing ever exists at the final path
//! unless the transfer finished.

use crate::api::client::PaheClient;
use crate::error::{PaheError, Result};
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Write-buffer size for streamed transfers
const CHUNK_BUF_SZ: usize = 1024 * 1024;

/// Temporary sibling for an in-flight transfer
fn temp_sibling(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}

/// Stream `url` to `output_path`.
///
/// `on_progress` receives cumulative bytes written and the declared total
/// when the server sent a `content-length` header.
pub async fn retrieve_direct<F>(
    client: &PaheClient,
    url: &str,
    output_path: &Path,
    on_progress: F,
) -> Result<()>
where
    F: FnMut(u64, Option<u64>),
{
    let resp = client
        .get(url)
        .await
        .map_err(|e| PaheError::DirectTransferError(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PaheError::DirectTransferError(format!(
            "{url} returned status {}",
            status.as_u16()
        )));
    }
    let total = resp.content_length();
    write_stream(resp.bytes_stream(), output_path, total, on_progress).await
}

/// Transfer core, generic over the byte stream so failure handling is
/// testable without a server.
pub(crate) async fn write_stream<S, B, E, F>(
    mut stream: S,
    output: &Path,
    total: Option<u64>,
    mut on_progress: F,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(u64, Option<u64>),
{
    let temp = temp_sibling(output);
    let file = File::create(&temp)
        .await
        .map_err(|e| PaheError::io(&temp, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_BUF_SZ, file);
    let mut written: u64 = 0;

    let outcome: Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| PaheError::DirectTransferError(e.to_string()))?;
            writer
                .write_all(chunk.as_ref())
                .await
                .map_err(|e| PaheError::io(&temp, e))?;
            written += chunk.as_ref().len() as u64;
            on_progress(written, total);
        }
        writer.flush().await.map_err(|e| PaheError::io(&temp, e))?;
        Ok(())
    }
    .await;

    if let Err(err) = outcome {
        drop(writer);
        // Best effort; the error we surface is the transfer failure.
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err);
    }

    if let Err(e) = tokio::fs::rename(&temp, output).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(PaheError::io(output, e));
    }
    debug!(bytes = written, path = %output.display(), "direct transfer complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;

    fn ok_chunks(chunks: Vec<&'static [u8]>) -> impl Stream<Item = std::result::Result<&'static [u8], Infallible>> + Unpin {
        stream::iter(chunks.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn writes_all_chunks_then_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ep1.mp4");
        let mut seen = Vec::new();
        write_stream(
            ok_chunks(vec![b"abc", b"defg", b"h"]),
            &output,
            Some(8),
            |written, total| seen.push((written, total)),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"abcdefgh");
        assert!(!temp_sibling(&output).exists());
        assert_eq!(seen, vec![(3, Some(8)), (7, Some(8)), (8, Some(8))]);
    }

    #[tokio::test]
    async fn progress_total_is_omitted_without_content_length() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ep1.mp4");
        let mut totals = Vec::new();
        write_stream(ok_chunks(vec![b"xy"]), &output, None, |_, total| {
            totals.push(total)
        })
        .await
        .unwrap();
        assert_eq!(totals, vec![None]);
    }

    #[tokio::test]
    async fn mid_transfer_failure_leaves_no_file_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ep2.mp4");
        let chunks: Vec<std::result::Result<&[u8], String>> =
            vec![Ok(b"partial "), Ok(b"bytes"), Err("connection reset".into())];
        let err = write_stream(stream::iter(chunks), &output, Some(100), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, PaheError::DirectTransferError(_)));
        assert!(!output.exists());
        assert!(!temp_sibling(&output).exists());
    }

    #[test]
    fn temp_sibling_stays_in_the_same_directory() {
        let temp = temp_sibling(Path::new("/downloads/show_EP4.mp4"));
        assert_eq!(temp, Path::new("/downloads/show_EP4.mp4.part"));
    }
}
