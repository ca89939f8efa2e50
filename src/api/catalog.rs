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


//! Catalog API wrappers
//!
//! Thin request/response calls against the site's `/api` endpoint: title
//! search and the paged per-title release listing. Episode numbers arrive as
//! JSON numbers and are occasionally fractional (recap episodes), so they
//! are kept as `f64` and matched by truncation.

use crate::api::client::{PaheClient, HOST};
use crate::error::Result;
use serde::Deserialize;

/// One search hit
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    /// Opaque per-title session id, used as the play-page slug
    pub session: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    data: Vec<SearchResult>,
}

/// One release entry for a title
#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    /// Episode number as published; fractional for recaps/specials
    pub episode: f64,
    /// Opaque per-episode session id used by the play page
    pub session: String,
}

impl Episode {
    /// Whole episode number used for selection and file naming
    pub fn number(&self) -> u32 {
        self.episode as u32
    }
}

#[derive(Debug, Deserialize)]
struct ReleasePage {
    last_page: u64,
    #[serde(default)]
    data: Vec<Episode>,
}

fn api_url() -> String {
    format!("{HOST}/api")
}

/// Search the catalog for `query`. An empty result set is not an error here;
/// the caller decides whether that ends the run.
pub async fn search(client: &PaheClient, query: &str) -> Result<Vec<SearchResult>> {
    let resp: SearchResponse = client
        .get_json(&api_url(), &[("m", "search"), ("q", query)])
        .await?;
    if resp.total == 0 {
        return Ok(Vec::new());
    }
    Ok(resp.data)
}

/// Fetch the full episode list for a title, walking every release page in
/// ascending order.
pub async fn episode_list(client: &PaheClient, title_session: &str) -> Result<Vec<Episode>> {
    let url = api_url();
    let mut episodes = Vec::new();
    let mut page: u64 = 1;
    loop {
        let page_str = page.to_string();
        let resp: ReleasePage = client
            .get_json(
                &url,
                &[
                    ("m", "release"),
                    ("id", title_session),
                    ("sort", "episode_asc"),
                    ("page", &page_str),
                ],
            )
            .await?;
        episodes.extend(resp.data);
        if page >= resp.last_page {
            break;
        }
        page += 1;
    }
    Ok(episodes)
}
