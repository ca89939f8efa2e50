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


//! Filesystem layout
//!
//! Final artifacts land in one downloads directory as
//! `{identifier}_EP{episode}.{container}`. Each episode gets a segment
//! scratch directory named deterministically from the output's stem, so a
//! crashed run's leftovers are recognizable and a rerun reuses the slot.

use crate::error::{PaheError, Result};
use std::path::{Path, PathBuf};

/// Characters that cannot appear in a filename component
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace forbidden filename characters with underscores.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .collect()
}

/// Ensure the downloads directory exists and return it.
pub async fn ensure_downloads_dir(dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PaheError::io(dir, e))?;
    Ok(dir.to_path_buf())
}

/// Final artifact path: `{identifier}_EP{episode}.{container}`.
pub fn episode_output_path(
    downloads_dir: &Path,
    identifier: &str,
    episode: u32,
    container: &str,
) -> PathBuf {
    let name = format!("{}_EP{episode}.{container}", sanitize_component(identifier));
    downloads_dir.join(name)
}

/// Per-episode segment scratch directory, named from the output's stem.
pub fn segment_temp_dir(output_file: &Path) -> PathBuf {
    let stem = output_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("episode");
    let parent = output_file.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("temp_{stem}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_carries_identifier_and_episode() {
        let path = episode_output_path(Path::new("downloads"), "great-show", 4, "mp4");
        assert_eq!(path, Path::new("downloads/great-show_EP4.mp4"));
    }

    #[test]
    fn identifier_is_sanitized() {
        let path = episode_output_path(Path::new("dl"), "show: part?2", 1, "mp4");
        assert_eq!(path, Path::new("dl/show_ part_2_EP1.mp4"));
    }

    #[test]
    fn temp_dir_is_deterministic_from_output_stem() {
        let out = Path::new("downloads/great-show_EP4.mp4");
        assert_eq!(
            segment_temp_dir(out),
            Path::new("downloads/temp_great-show_EP4")
        );
        // Same output path, same scratch dir.
        assert_eq!(segment_temp_dir(out), segment_temp_dir(out));
    }
}
