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


//! Per-episode download jobs
//!
//! A `DownloadJob` is the unit of work: one episode, one output path, one
//! temp directory, one shared session. Jobs share no mutable state, so a
//! batch can run them sequentially (as the CLI does) or in parallel without
//! coordination. A failure anywhere leaves no committed output file.

pub mod direct;
pub mod manifest;
pub mod retry;
pub mod segments;

use crate::api::client::PaheClient;
use crate::config::DownloadConfig;
use crate::error::{PaheError, Result};
use crate::paths::{ensure_downloads_dir, episode_output_path, segment_temp_dir};
use crate::remux::concat_segments;
use crate::resolve::{resolve, ResolutionRequest, StreamLocator};
use retry::AttemptError;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use retry::RetryPolicy;

/// One episode's worth of work
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Identifier used for output naming
    pub target_name: String,
    /// Title slug for the play page
    pub slug: String,
    /// Episode number as selected by the user
    pub episode_number: u32,
    /// Per-episode session id
    pub episode_session: String,
    /// Quality preference for this job
    pub quality: Option<String>,
}

impl DownloadJob {
    fn resolution_request(&self) -> ResolutionRequest {
        ResolutionRequest {
            slug: self.slug.clone(),
            session: self.episode_session.clone(),
            quality: self.quality.clone(),
        }
    }
}

/// Resolve the job's media locator without downloading anything.
pub async fn resolve_locator(client: &PaheClient, job: &DownloadJob) -> Result<StreamLocator> {
    resolve(client, &job.resolution_request()).await
}

fn container_for(locator: &StreamLocator) -> String {
    match locator {
        // Segmented TS streams are remuxed into an mp4 container.
        StreamLocator::Playlist(_) => "mp4".to_string(),
        StreamLocator::File(url) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('.').next())
            .filter(|ext| !ext.contains('/'))
            .unwrap_or("mp4")
            .to_string(),
    }
}

/// Download one resolved episode to its final artifact path.
///
/// `on_progress` receives cumulative bytes and the declared total for
/// direct transfers; segmented retrieval reports per-stage log lines
/// instead.
pub async fn run(
    client: &PaheClient,
    config: &DownloadConfig,
    job: &DownloadJob,
    locator: &StreamLocator,
    on_progress: impl FnMut(u64, Option<u64>),
) -> Result<PathBuf> {
    let downloads = ensure_downloads_dir(&config.downloads_dir).await?;
    let output = episode_output_path(
        &downloads,
        &job.target_name,
        job.episode_number,
        &container_for(locator),
    );

    match locator {
        StreamLocator::File(url) => {
            info!(episode = job.episode_number, %url, "direct transfer");
            direct::retrieve_direct(client, url, &output, on_progress).await?;
        }
        StreamLocator::Playlist(url) => {
            info!(episode = job.episode_number, %url, "segmented retrieval");
            download_playlist(client, config, url, &output).await?;
        }
    }
    Ok(output)
}

async fn download_playlist(
    client: &PaheClient,
    config: &DownloadConfig,
    url: &str,
    output: &Path,
) -> Result<()> {
    let manifest = manifest::fetch_manifest(client, url).await?;
    debug!(segments = manifest.len(), "manifest fetched");

    let fetch = |url: String| {
        let client = client.clone();
        async move {
            let resp = client
                .get(&url)
                .await
                .map_err(|e| AttemptError::Transport(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(AttemptError::Status(status.as_u16()));
            }
            resp.bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| AttemptError::Transport(e.to_string()))
        }
    };
    assemble_with(&manifest, fetch, &config.retry, output, config.debug).await
}

/// Retrieve every segment of `manifest` and concatenate the pieces into
/// `output`. Generic over the per-attempt fetch so the failure branch is
/// testable without a server.
///
/// `keep_temp` preserves the segment directory for inspection; the final
/// output is still removed on failure.
pub(crate) async fn assemble_with<F, Fut>(
    manifest: &manifest::StreamManifest,
    fetch: F,
    policy: &RetryPolicy,
    output: &Path,
    keep_temp: bool,
) -> Result<()>
where
    F: Fn(String) -> Fut + Clone,
    Fut: Future<Output = std::result::Result<Vec<u8>, AttemptError>>,
{
    let temp_dir = segment_temp_dir(output);
    tokio::fs::create_dir_all(&temp_dir)
        .await
        .map_err(|e| PaheError::io(&temp_dir, e))?;

    let outcome = async {
        let files = segments::retrieve_with(manifest, &temp_dir, policy, fetch).await?;
        concat_segments(&files, &temp_dir, output).await
    }
    .await;

    match outcome {
        Ok(()) => {
            if !keep_temp {
                let _ = tokio::fs::remove_dir_all(&temp_dir).await;
            }
            Ok(())
        }
        Err(err) => {
            // Never leave a committed final file behind a failure. The
            // concat tool may have begun writing the output before it died.
            let _ = tokio::fs::remove_file(output).await;
            if !keep_temp {
                let _ = tokio::fs::remove_dir_all(&temp_dir).await;
            }
            Err(err)
        }
    }
}
