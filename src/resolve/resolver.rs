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


//! Multi-hop stream resolution
//!
//! Turns a (title slug, episode session) pair into a fetchable media
//! locator. The play page lists per-quality download buttons whose
//! `data-src` points at an intermediate player page, which in turn hides the
//! real stream URL either in plain markup or inside a packed-code block.
//!
//! The locator scan is an ordered chain of progressively looser patterns;
//! first match wins. The final pattern accepts any URL with a known media
//! extension, which can false-positive on pages carrying unrelated media
//! links. That looseness is intentional slack for player markup changes, so
//! tighten the chain only against observed pages.

use crate::api::client::{PaheClient, HOST};
use crate::error::{PaheError, Result};
use crate::resolve::unpack::{deobfuscate, ObfuscatedPayload};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Immutable description of one resolution
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    /// Title slug (the catalog's per-title session id)
    pub slug: String,
    /// Per-episode session id
    pub session: String,
    /// Preferred quality label, e.g. "1080"
    pub quality: Option<String>,
}

/// One alternative encoding offered by the play page
#[derive(Debug, Clone)]
pub struct StreamCandidate {
    /// Intermediate player page this button links to
    pub locator: String,
    /// Quality label as printed on the button ("720", "1080", ...)
    pub quality_label: String,
    /// AV1 encodes are excluded: the reassembly path expects H.264 TS
    pub is_excluded_codec: bool,
}

/// Final, fetchable media locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLocator {
    /// Segmented stream manifest (`.m3u8`)
    Playlist(String),
    /// Complete media file (`.mp4`)
    File(String),
}

impl StreamLocator {
    fn classify(url: String) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(&url);
        if path.ends_with(".m3u8") {
            Self::Playlist(url)
        } else {
            Self::File(url)
        }
    }

    /// The URL, whichever form it takes
    pub fn url(&self) -> &str {
        match self {
            Self::Playlist(u) | Self::File(u) => u,
        }
    }
}

/// Resolve an episode to its media locator.
pub async fn resolve(client: &PaheClient, request: &ResolutionRequest) -> Result<StreamLocator> {
    let play_url = format!("{HOST}/play/{}/{}", request.slug, request.session);
    let play_page = fetch_page(client, &play_url).await?;

    let candidates = extract_candidates(&play_page);
    debug!(count = candidates.len(), "candidates on play page");
    let chosen = select_candidate(&candidates, request.quality.as_deref())?;
    debug!(quality = %chosen.quality_label, url = %chosen.locator, "selected candidate");

    let player_page = fetch_page(client, &chosen.locator).await?;
    locate_stream(&player_page)
}

async fn fetch_page(client: &PaheClient, url: &str) -> Result<String> {
    client
        .get_text(url)
        .await
        .map_err(|e| page_unavailable(url, e))
}

/// Fold any session error into `PageUnavailable`; a page that cannot be
/// fetched for any reason gets one episode-scoped variant.
fn page_unavailable(url: &str, err: PaheError) -> PaheError {
    let reason = match err {
        PaheError::ApiRequestFailed { status, .. } => format!("status {status}"),
        other => other.to_string(),
    };
    PaheError::PageUnavailable {
        url: url.to_string(),
        reason,
    }
}

/// Pull every download button off the play page.
///
/// A missing `data-av1` attribute counts as the excluded codec; the site
/// only labels the streams it knows are plain H.264 with `data-av1="0"`.
pub fn extract_candidates(html: &str) -> Vec<StreamCandidate> {
    let doc = Html::parse_document(html);
    let selector =
        Selector::parse("button[data-src]").expect("static selector");

    doc.select(&selector)
        .filter_map(|el| {
            let src = el.value().attr("data-src")?;
            let label = el.value().attr("data-resolution").unwrap_or_default();
            let av1 = el.value().attr("data-av1").unwrap_or("1");
            Some(StreamCandidate {
                locator: src.to_string(),
                quality_label: label.to_string(),
                is_excluded_codec: av1 != "0",
            })
        })
        .collect()
}

fn label_rank(label: &str) -> u64 {
    // Non-numeric labels sort below every numeric one.
    label.parse::<u64>().unwrap_or(0)
}

/// Pick one candidate by quality preference.
///
/// Exact label match wins when the preference is present among the usable
/// candidates; otherwise the numerically greatest label is taken. Candidates
/// flagged as the excluded codec are never chosen.
pub fn select_candidate<'a>(
    candidates: &'a [StreamCandidate],
    quality: Option<&str>,
) -> Result<&'a StreamCandidate> {
    let usable: Vec<&StreamCandidate> = candidates
        .iter()
        .filter(|c| !c.is_excluded_codec)
        .collect();
    if usable.is_empty() {
        return Err(PaheError::NoCandidates);
    }

    if let Some(wanted) = quality {
        if let Some(exact) = usable.iter().find(|c| c.quality_label == wanted) {
            return Ok(exact);
        }
    }

    // max_by_key keeps the last maximal element, matching the play page's
    // own ordering for equal labels.
    Ok(usable
        .into_iter()
        .max_by_key(|c| label_rank(&c.quality_label))
        .expect("usable is non-empty"))
}

/// Ordered locator patterns, tightest first:
/// 1. explicit `source='...'` assignment,
/// 2. any quoted media URL,
/// 3. any bare media URL.
fn locator_patterns() -> Vec<Regex> {
    [
        r#"source\s*=\s*'(https?://[^']+?\.(?:m3u8|mp4)[^']*)'"#,
        r#"["'](https?://[^"']+?\.(?:m3u8|mp4)(?:\?[^"']*)?)["']"#,
        r#"(https?://[^\s"'<>]+?\.(?:m3u8|mp4)[^\s"'<>]*)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
}

/// First-match-wins scan over the pattern chain.
fn scan_for_locator(text: &str) -> Option<String> {
    for pattern in locator_patterns() {
        if let Some(caps) = pattern.captures(text) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Capture a packed-code block's four parameters from page markup.
pub fn find_packed_payload(html: &str) -> Option<ObfuscatedPayload> {
    let signature = Regex::new(
        r"(?s)eval\(function\(p,a,c,k,e,[dr]\).*?\}\('(?P<p>.*)',\s*(?P<a>\d+),\s*(?P<c>\d+),\s*'(?P<k>[^']*)'\.split\('\|'\)",
    )
    .expect("static pattern");

    let caps = signature.captures(html)?;
    // The payload is a single-quoted JS string; undo its escapes.
    let packed = caps["p"].replace(r"\'", "'").replace(r"\\", r"\");
    let radix = caps["a"].parse().ok()?;
    let token_count: usize = caps["c"].parse().ok()?;
    let dictionary: Vec<String> = caps["k"].split('|').map(str::to_string).collect();
    Some(ObfuscatedPayload {
        packed,
        radix,
        token_count,
        dictionary,
    })
}

/// Scan an intermediate player page for the stream URL, falling back to
/// packed-code reversal when the markup hides it.
pub fn locate_stream(html: &str) -> Result<StreamLocator> {
    if let Some(url) = scan_for_locator(html) {
        return Ok(StreamLocator::classify(url));
    }

    let Some(payload) = find_packed_payload(html) else {
        return Err(PaheError::LocatorNotFound);
    };
    debug!(
        radix = payload.radix,
        tokens = payload.token_count,
        "reversing packed code block"
    );
    let plaintext = deobfuscate(&payload)?;
    match scan_for_locator(&plaintext) {
        Some(url) => Ok(StreamLocator::classify(url)),
        None => Err(PaheError::DeobfuscationFailed(
            "deobfuscated output contains no media locator".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(label: &str, excluded: bool) -> StreamCandidate {
        StreamCandidate {
            locator: format!("https://kwik.example/e/{label}"),
            quality_label: label.to_string(),
            is_excluded_codec: excluded,
        }
    }

    #[test]
    fn extracts_buttons_and_flags_av1() {
        let html = r#"
            <html><body>
            <button data-src="https://kwik.example/e/a" data-resolution="720" data-av1="0">720p</button>
            <button data-src="https://kwik.example/e/b" data-resolution="1080" data-av1="1">1080p av1</button>
            <button data-src="https://kwik.example/e/c" data-resolution="360">360p</button>
            <button data-resolution="480">no src</button>
            </body></html>"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 3);
        assert!(!candidates[0].is_excluded_codec);
        assert!(candidates[1].is_excluded_codec);
        // Missing data-av1 is treated as excluded.
        assert!(candidates[2].is_excluded_codec);
    }

    #[test]
    fn no_preference_selects_greatest_label() {
        let c = vec![
            candidate("360", false),
            candidate("720", false),
            candidate("1080", false),
        ];
        assert_eq!(select_candidate(&c, None).unwrap().quality_label, "1080");
    }

    #[test]
    fn exact_preference_wins() {
        let c = vec![
            candidate("360", false),
            candidate("720", false),
            candidate("1080", false),
        ];
        assert_eq!(
            select_candidate(&c, Some("720")).unwrap().quality_label,
            "720"
        );
    }

    #[test]
    fn absent_preference_falls_back_to_greatest() {
        let c = vec![candidate("360", false), candidate("720", false)];
        assert_eq!(
            select_candidate(&c, Some("4000")).unwrap().quality_label,
            "720"
        );
    }

    #[test]
    fn excluded_codec_never_selected() {
        let c = vec![candidate("720", false), candidate("1080", true)];
        assert_eq!(select_candidate(&c, None).unwrap().quality_label, "720");
        // Even an exact preference cannot pick the excluded encode.
        assert_eq!(
            select_candidate(&c, Some("1080")).unwrap().quality_label,
            "720"
        );
    }

    #[test]
    fn non_numeric_labels_rank_lowest() {
        let c = vec![candidate("auto", false), candidate("480", false)];
        assert_eq!(select_candidate(&c, None).unwrap().quality_label, "480");
    }

    #[test]
    fn all_excluded_is_no_candidates() {
        let c = vec![candidate("720", true)];
        assert!(matches!(
            select_candidate(&c, None),
            Err(PaheError::NoCandidates)
        ));
    }

    #[test]
    fn source_assignment_beats_other_quoted_urls() {
        let page = r#"
            <a href="https://cdn.example/trailer.mp4">trailer</a>
            <script>const source='https://vault.example/hls/ep1.m3u8';</script>
        "#;
        assert_eq!(
            scan_for_locator(page).unwrap(),
            "https://vault.example/hls/ep1.m3u8"
        );
    }

    #[test]
    fn quoted_url_matches_when_no_assignment_present() {
        let page = r#"<video src="https://cdn.example/media/ep2.mp4?st=tok"></video>"#;
        assert_eq!(
            scan_for_locator(page).unwrap(),
            "https://cdn.example/media/ep2.mp4?st=tok"
        );
    }

    #[test]
    fn bare_url_is_the_loosest_fallback() {
        let page = "playlist at https://cdn.example/x/master.m3u8 today";
        assert_eq!(
            scan_for_locator(page).unwrap(),
            "https://cdn.example/x/master.m3u8"
        );
    }

    #[test]
    fn classifies_playlist_vs_file() {
        assert_eq!(
            StreamLocator::classify("https://a/b.m3u8?tok=1".into()),
            StreamLocator::Playlist("https://a/b.m3u8?tok=1".into())
        );
        assert_eq!(
            StreamLocator::classify("https://a/b.mp4".into()),
            StreamLocator::File("https://a/b.mp4".into())
        );
    }

    #[test]
    fn captures_packed_payload_parameters() {
        let html = concat!(
            "<script>eval(function(p,a,c,k,e,d){while(c--)if(k[c])p=p.replace(new RegExp('\\\\b'+e(c)+'\\\\b','g'),k[c]);return p}",
            "('1 0=\\'2\\'',3,3,'source|const|https://vault.example/hls/ep3.m3u8'.split('|'),0,{}))</script>"
        );
        let payload = find_packed_payload(html).unwrap();
        assert_eq!(payload.radix, 3);
        assert_eq!(payload.token_count, 3);
        assert_eq!(payload.dictionary.len(), 3);
        assert_eq!(payload.packed, "1 0='2'");
    }

    #[test]
    fn locate_stream_falls_back_through_deobfuscation() {
        // The URL only exists in pieces across the dictionary, so the first
        // scan pass over the raw page cannot find it.
        let html = concat!(
            "<html><body><script>eval(function(p,a,c,k,e,d){}",
            "('1 0=\\'2://3.4/5/6.m3u8\\'',7,7,",
            "'source|const|https|vault|example|hls|ep3'.split('|'),0,{}))",
            "</script></body></html>"
        );
        let locator = locate_stream(html).unwrap();
        assert_eq!(
            locator,
            StreamLocator::Playlist("https://vault.example/hls/ep3.m3u8".into())
        );
    }

    #[test]
    fn locate_stream_without_packed_block_is_locator_not_found() {
        assert!(matches!(
            locate_stream("<html><body>nothing here</body></html>"),
            Err(PaheError::LocatorNotFound)
        ));
    }

    #[test]
    fn page_errors_fold_into_page_unavailable() {
        let err = page_unavailable(
            "https://animepahe.ru/play/x/y",
            PaheError::ApiRequestFailed {
                endpoint: "https://animepahe.ru/play/x/y".into(),
                status: 404,
            },
        );
        match err {
            PaheError::PageUnavailable { url, reason } => {
                assert_eq!(url, "https://animepahe.ru/play/x/y");
                assert_eq!(reason, "status 404");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn packed_block_without_url_is_deobfuscation_failure() {
        let html = concat!(
            "<script>eval(function(p,a,c,k,e,d){}",
            "('0 1',2,2,'hello|world'.split('|'),0,{}))</script>"
        );
        assert!(matches!(
            locate_stream(html),
            Err(PaheError::DeobfuscationFailed(_))
        ));
    }
}
