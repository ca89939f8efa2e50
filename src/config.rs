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


//! Download configuration
//!
//! One `DownloadConfig` value is built by the CLI and passed into each
//! component at construction. Nothing in the library reads process-global
//! state, so independent jobs built from clones of the same config can run
//! without coordination.

use crate::download::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-request timeout. The upstream service occasionally blackholes
/// connections instead of resetting them; without a timeout a single segment
/// can stall the whole job.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-run download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Preferred quality label (e.g. "1080"); exact match wins, otherwise
    /// the numerically greatest available label is chosen
    pub quality: Option<String>,

    /// Print the resolved locator instead of downloading
    pub list_only: bool,

    /// Keep temporary segment files and surface internal diagnostics
    pub debug: bool,

    /// Directory final artifacts are written to
    pub downloads_dir: PathBuf,

    /// Per-request timeout applied to the shared client
    pub request_timeout: Duration,

    /// Retry policy for segment retrieval
    pub retry: RetryPolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            quality: None,
            list_only: false,
            debug: false,
            downloads_dir: PathBuf::from("downloads"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}
