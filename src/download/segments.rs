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


//! Concurrent segment retrieval
//!
//! Every segment of a manifest is fetched as its own task; all tasks are
//! launched at once and awaited jointly, so a failure never cancels work
//! already in flight. Network calls are the only suspension points and each
//! task writes only its own file, so no locking is needed.
//!
//! Segment files are named by zero-padded index, five digits wide, so a
//! lexical sort of the directory reproduces manifest order for any manifest
//! under 100000 segments. The reassembler's file list is built from the
//! returned paths, which carry manifest order directly.

use crate::download::manifest::StreamManifest;
use crate::download::retry::{AttemptError, RetryPolicy};
use crate::error::{PaheError, Result};
use futures_util::future::join_all;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name for a segment index; zero-padding keeps lexical order equal to
/// manifest order up to 99999 segments, far past any real manifest.
pub fn segment_file_name(index: usize) -> String {
    format!("{index:05}.ts")
}

/// Fetch every segment into `dir`, returning the written paths in manifest
/// order. Generic over the per-attempt fetch so tests can inject failures
/// without a server.
///
/// Any segment that exhausts its retry budget fails the whole retrieval;
/// the caller is expected to abort the job and clean up rather than produce
/// a partial output.
pub(crate) async fn retrieve_with<F, Fut>(
    manifest: &StreamManifest,
    dir: &Path,
    policy: &RetryPolicy,
    fetch: F,
) -> Result<Vec<PathBuf>>
where
    F: Fn(String) -> Fut + Clone,
    Fut: Future<Output = std::result::Result<Vec<u8>, AttemptError>>,
{
    let tasks = manifest.segments.iter().map(|segment| {
        let fetch = fetch.clone();
        let path = dir.join(segment_file_name(segment.index));
        let url = segment.url.clone();
        let index = segment.index;
        async move {
            let body = policy
                .run(|| fetch(url.clone()))
                .await
                .map_err(|(attempts, err)| {
                    warn!(index, %url, %err, "segment exhausted its retry budget");
                    PaheError::SegmentRetrievalExhausted {
                        index,
                        attempts,
                        reason: err.to_string(),
                    }
                })?;
            tokio::fs::write(&path, &body)
                .await
                .map_err(|e| PaheError::io(&path, e))?;
            Ok::<PathBuf, PaheError>(path)
        }
    });

    // join_all: every launched task runs to completion even when one fails.
    let results = join_all(tasks).await;

    let mut paths = Vec::with_capacity(results.len());
    let mut failure: Option<PaheError> = None;
    for result in results {
        match result {
            Ok(path) => paths.push(path),
            // Keep the lowest-index failure for a deterministic report.
            Err(err) => {
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }
    }
    match failure {
        Some(err) => Err(err),
        None => {
            debug!(count = paths.len(), "all segments retrieved");
            Ok(paths)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::manifest::SegmentRef;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn manifest(n: usize) -> StreamManifest {
        StreamManifest {
            segments: (0..n)
                .map(|i| SegmentRef {
                    index: i,
                    url: format!("https://cdn.example/seg/{i}.ts"),
                })
                .collect(),
        }
    }

    #[test]
    fn file_names_sort_lexically_in_manifest_order() {
        // Crossing a digit-count boundary is where naive naming breaks
        // ("10000" sorts before "2000"), so straddle one explicitly.
        let mut names: Vec<String> = (9995..=10005).map(segment_file_name).collect();
        let ordered = names.clone();
        names.sort();
        assert_eq!(names, ordered);
        assert_eq!(segment_file_name(7), "00007.ts");
        assert_eq!(segment_file_name(10000), "10000.ts");
    }

    #[tokio::test]
    async fn writes_every_segment_body_under_its_index() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetryPolicy::default();
        let m = manifest(5);
        let paths = retrieve_with(&m, dir.path(), &policy, |url: String| async move {
            Ok(format!("body of {url}").into_bytes())
        })
        .await
        .unwrap();

        assert_eq!(paths.len(), 5);
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(path.file_name().unwrap().to_str().unwrap(), segment_file_name(i));
            let body = std::fs::read_to_string(path).unwrap();
            assert_eq!(body, format!("body of https://cdn.example/seg/{i}.ts"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completion_order_does_not_affect_reassembly_order() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetryPolicy::default();
        let m = manifest(4);
        // Later segments finish first.
        let paths = retrieve_with(&m, dir.path(), &policy, |url: String| async move {
            let i: u64 = url
                .rsplit('/')
                .next()
                .unwrap()
                .trim_end_matches(".ts")
                .parse()
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100 - i * 10)).await;
            Ok(vec![i as u8])
        })
        .await
        .unwrap();

        let concatenated: Vec<u8> = paths
            .iter()
            .flat_map(|p| std::fs::read(p).unwrap())
            .collect();
        assert_eq!(concatenated, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn transient_status_failures_recover_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetryPolicy::default();
        let m = manifest(1);
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();
        let result = retrieve_with(&m, dir.path(), &policy, move |_url: String| {
            let seen = seen.clone();
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AttemptError::Status(503))
                } else {
                    Ok(b"ok".to_vec())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn one_exhausted_segment_fails_the_whole_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetryPolicy {
            max_attempts: 3,
            transport_delay: Duration::from_millis(1),
        };
        let m = manifest(3);
        let err = retrieve_with(&m, dir.path(), &policy, |url: String| async move {
            if url.ends_with("/1.ts") {
                Err(AttemptError::Status(404))
            } else {
                Ok(b"ok".to_vec())
            }
        })
        .await
        .unwrap_err();

        match err {
            PaheError::SegmentRetrievalExhausted {
                index, attempts, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The healthy segments still completed; the job layer removes the
        // directory, never promotes it.
        assert!(dir.path().join(segment_file_name(0)).exists());
        assert!(dir.path().join(segment_file_name(2)).exists());
        assert!(!dir.path().join(segment_file_name(1)).exists());
    }

    #[tokio::test]
    async fn distinct_failures_report_the_lowest_index() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetryPolicy {
            max_attempts: 1,
            transport_delay: Duration::from_millis(1),
        };
        let m = manifest(4);
        let err = retrieve_with(&m, dir.path(), &policy, |url: String| async move {
            let bad: HashMap<&str, u16> = [("/3.ts", 500), ("/2.ts", 404)].into();
            match bad.iter().find(|(suffix, _)| url.ends_with(*suffix)) {
                Some((_, status)) => Err(AttemptError::Status(*status)),
                None => Ok(b"ok".to_vec()),
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PaheError::SegmentRetrievalExhausted { index: 2, .. }
        ));
    }
}
