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


//! pahe-dl: locate a playable stream behind the host's redirection and
//! obfuscation layers, then retrieve it reliably as one local file.
//!
//! The pipeline: resolve the episode's play page into a media locator
//! ([`resolve`]), then either fetch and reassemble a segmented stream or
//! stream a direct file to disk ([`download`]). Catalog search and episode
//! listing live in [`api::catalog`]; everything runs over one
//! browser-shaped HTTP session per job ([`api::client::PaheClient`]).

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod paths;
pub mod remux;
pub mod resolve;

pub use api::client::PaheClient;
pub use config::DownloadConfig;
pub use download::DownloadJob;
pub use error::{PaheError, Result};
pub use resolve::StreamLocator;
