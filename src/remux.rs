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


//! Reassembly boundary
//!
//! Segment files are concatenated losslessly by ffmpeg's concat demuxer
//! (`-c copy`, no re-encode). The tool's stderr is captured so a failure is
//! loud and diagnosable instead of a silently truncated file. Everything
//! else about segment lifecycle (directory creation, retention, deletion)
//! belongs to the job layer.

use crate::error::{PaheError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const FFMPEG_BIN: &str = "ffmpeg";

/// Write the concat demuxer's file list next to the segments.
///
/// Entries are written in slice order with paths relative to the list file,
/// which is how the demuxer resolves them under `-safe 0`.
pub async fn write_file_list(segment_files: &[PathBuf], dir: &Path) -> Result<PathBuf> {
    let list_path = dir.join("filelist.txt");
    let mut body = String::new();
    for path in segment_files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PaheError::ReassemblyToolError {
                    stderr: format!("segment path {} has no usable file name", path.display()),
                }
            })?;
        body.push_str(&format!("file '{name}'\n"));
    }
    tokio::fs::write(&list_path, &body)
        .await
        .map_err(|e| PaheError::io(&list_path, e))?;
    Ok(list_path)
}

/// Concatenate ordered segment files into `output`.
pub async fn concat_segments(segment_files: &[PathBuf], dir: &Path, output: &Path) -> Result<()> {
    let list_path = write_file_list(segment_files, dir).await?;
    run_concat(FFMPEG_BIN, &list_path, output).await?;
    debug!(segments = segment_files.len(), output = %output.display(), "reassembly complete");
    Ok(())
}

async fn run_concat(tool: &str, list_path: &Path, output: &Path) -> Result<()> {
    let result = Command::new(tool)
        .arg("-y")
        .args(["-loglevel", "error"])
        .args(["-f", "concat"])
        .args(["-safe", "0"])
        .arg("-i")
        .arg(list_path)
        .args(["-c", "copy"])
        .arg(output)
        .output()
        .await;

    let out = match result {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PaheError::ReassemblyToolMissing(format!(
                "{tool} is not on PATH"
            )))
        }
        Err(e) => {
            return Err(PaheError::ReassemblyToolError {
                stderr: format!("failed to launch {tool}: {e}"),
            })
        }
    };

    if !out.status.success() {
        return Err(PaheError::ReassemblyToolError {
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    if !output.exists() {
        return Err(PaheError::ReassemblyToolError {
            stderr: format!("{tool} exited cleanly but produced no output file"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_list_preserves_segment_order() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..3)
            .map(|i| dir.path().join(format!("{i:04}.ts")))
            .collect();
        let list = write_file_list(&files, dir.path()).await.unwrap();
        let body = std::fs::read_to_string(&list).unwrap();
        assert_eq!(body, "file '0000.ts'\nfile '0001.ts'\nfile '0002.ts'\n");
    }

    #[tokio::test]
    async fn missing_tool_is_its_own_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("filelist.txt");
        std::fs::write(&list, "file '0000.ts'\n").unwrap();
        let err = run_concat("pahe-dl-no-such-tool", &list, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaheError::ReassemblyToolMissing(_)));
    }
}
