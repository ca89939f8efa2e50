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


//! Error types for pahe-dl
//!
//! This module defines error types using thiserror for ergonomic error
//! handling. Variants are grouped by pipeline stage (resolution, manifest,
//! retrieval, reassembly) so callers can distinguish per-episode failures,
//! which are reported and skipped, from fatal ones that end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our PaheError type
pub type Result<T> = std::result::Result<T, PaheError>;

/// Main error type for pahe-dl
#[derive(Error, Debug)]
pub enum PaheError {
    // ===== Resolution Errors =====

    /// The play page could not be fetched (non-2xx or transport failure)
    #[error("play page unavailable: {url} ({reason})")]
    PageUnavailable { url: String, reason: String },

    /// The play page exposed no usable stream candidates
    #[error("no stream candidates found on play page")]
    NoCandidates,

    /// Neither the intermediate page nor the deobfuscated text contained a
    /// media locator
    #[error("no media locator found in intermediate page")]
    LocatorNotFound,

    /// The packed-code block could not be reversed into usable plaintext
    #[error("deobfuscation failed: {0}")]
    DeobfuscationFailed(String),

    // ===== Retrieval Errors =====

    /// The playlist body did not parse into a complete segment list
    #[error("manifest parse error: {0}")]
    ManifestParseError(String),

    /// A segment exhausted its retry budget; the whole job is aborted
    #[error("segment {index} failed after {attempts} attempts: {reason}")]
    SegmentRetrievalExhausted {
        index: usize,
        attempts: u32,
        reason: String,
    },

    /// A direct (non-segmented) transfer failed; the temp file was removed
    #[error("direct transfer failed: {0}")]
    DirectTransferError(String),

    // ===== Reassembly Errors =====

    /// ffmpeg exited non-zero; carries the tool's captured diagnostics
    #[error("reassembly tool failed: {stderr}")]
    ReassemblyToolError { stderr: String },

    /// ffmpeg binary not found on PATH
    #[error("ffmpeg not found: {0}")]
    ReassemblyToolMissing(String),

    // ===== API Errors =====

    /// Catalog API request returned a non-success status
    #[error("API request failed: {endpoint} returned status {status}")]
    ApiRequestFailed { endpoint: String, status: u16 },

    /// Catalog API returned a body we could not interpret
    #[error("invalid API response: {0}")]
    InvalidApiResponse(String),

    // ===== Transport / Filesystem =====

    /// Underlying HTTP transport error
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Filesystem operation failed
    #[error("file I/O error at {}: {source}", path.display())]
    FileIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// URL could not be parsed or joined
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl PaheError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIoError {
            path: path.into(),
            source,
        }
    }

    /// True for failures that should be reported per episode while the
    /// batch moves on; false for failures that end the whole run.
    pub fn is_episode_scoped(&self) -> bool {
        !matches!(
            self,
            Self::ReassemblyToolError { .. } | Self::ReassemblyToolMissing(_)
        )
    }
}
