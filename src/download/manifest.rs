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


//! Segmented-stream manifest retrieval
//!
//! Fetches a media playlist and flattens it into a dense, ordered segment
//! list. Ordering is playback order and must survive untouched through to
//! reassembly. Partial manifests are refused: one unresolvable entry fails
//! the whole parse.

use crate::api::client::PaheClient;
use crate::error::{PaheError, Result};
use m3u8_rs::Playlist;
use url::Url;

/// One segment locator, dense 0-based index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRef {
    pub index: usize,
    pub url: String,
}

/// Ordered segment list for one stream
#[derive(Debug, Clone)]
pub struct StreamManifest {
    pub segments: Vec<SegmentRef>,
}

impl StreamManifest {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Fetch and parse the playlist at `url`.
pub async fn fetch_manifest(client: &PaheClient, url: &str) -> Result<StreamManifest> {
    let resp = client.get(url).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PaheError::ManifestParseError(format!(
            "playlist fetch returned status {}",
            status.as_u16()
        )));
    }
    let body = resp.bytes().await?;
    parse_manifest(&body, url)
}

/// Parse a playlist body, resolving relative segment URIs against
/// `base_url`.
pub fn parse_manifest(body: &[u8], base_url: &str) -> Result<StreamManifest> {
    let base = Url::parse(base_url)?;
    let playlist = m3u8_rs::parse_playlist_res(body)
        .map_err(|e| PaheError::ManifestParseError(e.to_string()))?;

    let media = match playlist {
        Playlist::MediaPlaylist(mp) => mp,
        Playlist::MasterPlaylist(_) => {
            return Err(PaheError::ManifestParseError(
                "expected a media playlist, got a master playlist".into(),
            ))
        }
    };

    let mut segments = Vec::with_capacity(media.segments.len());
    for (index, segment) in media.segments.iter().enumerate() {
        let resolved = base.join(&segment.uri).map_err(|e| {
            PaheError::ManifestParseError(format!(
                "segment {index} URI {:?} does not resolve: {e}",
                segment.uri
            ))
        })?;
        segments.push(SegmentRef {
            index,
            url: resolved.to_string(),
        });
    }

    if segments.is_empty() {
        return Err(PaheError::ManifestParseError(
            "playlist contains no segments".into(),
        ));
    }
    Ok(StreamManifest { segments })
}
