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


use std::collections::BTreeSet;
use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pahe_dl::api::{catalog, PaheClient};
use pahe_dl::download::{self, DownloadJob};
use pahe_dl::{DownloadConfig, PaheError, StreamLocator};

#[derive(Parser)]
#[command(name = "pahe-dl")]
#[command(about = "Download anime episodes from AnimePahe", version)]
struct Cli {
    /// Anime name to search for (interactive selection)
    #[arg(short, long, conflicts_with = "slug")]
    anime: Option<String>,

    /// Anime slug/session id (skips search)
    #[arg(short, long)]
    slug: Option<String>,

    /// Episode number(s), e.g. "1-3,5,7-9"
    #[arg(short, long)]
    episodes: Option<String>,

    /// Preferred resolution label, e.g. 1080 or 720
    #[arg(short, long)]
    resolution: Option<String>,

    /// Print the resolved stream locator instead of downloading
    #[arg(short, long)]
    list: bool,

    /// Keep temporary segment files and enable verbose diagnostics
    #[arg(short, long)]
    debug: bool,
}

struct Console {
    list_only: bool,
}

impl Console {
    fn info(&self, msg: &str) {
        if !self.list_only {
            println!("\x1b[32m[INFO]\x1b[0m {msg}");
        }
    }

    fn warn(&self, msg: &str) {
        if !self.list_only {
            println!("\x1b[33m[WARNING]\x1b[0m {msg}");
        }
    }

    /// Print an error line and terminate the process. Errors are shown even
    /// in list-only mode.
    fn fail(&self, msg: &str) -> ! {
        println!("\x1b[31m[ERROR]\x1b[0m {msg}");
        std::process::exit(1);
    }
}

/// Expand "1-3,5,7-9" into {1,2,3,5,7,8,9}; duplicates collapse and the set
/// iterates in ascending order.
fn expand_episode_spec(spec: &str) -> anyhow::Result<BTreeSet<u32>> {
    let mut episodes = BTreeSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().context("invalid range start")?;
                let end: u32 = end.trim().parse().context("invalid range end")?;
                if start > end {
                    anyhow::bail!("range {part:?} runs backwards");
                }
                episodes.extend(start..=end);
            }
            None => {
                episodes.insert(part.parse().context("invalid episode number")?);
            }
        }
    }
    if episodes.is_empty() {
        anyhow::bail!("no episodes in selection");
    }
    Ok(episodes)
}

fn prompt(line: &str) -> anyhow::Result<String> {
    print!("{line}");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "pahe_dl=debug" } else { "pahe_dl=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let console = Console {
        list_only: cli.list,
    };

    let config = DownloadConfig {
        quality: cli.resolution.clone(),
        list_only: cli.list,
        debug: cli.debug,
        ..DownloadConfig::default()
    };

    let client = match PaheClient::new(config.request_timeout) {
        Ok(client) => client,
        Err(e) => console.fail(&format!("failed to build HTTP session: {e}")),
    };

    // Work out which title we are downloading.
    let slug = if let Some(query) = &cli.anime {
        let results = match catalog::search(&client, query).await {
            Ok(results) => results,
            Err(e) => console.fail(&format!("search failed: {e}")),
        };
        if results.is_empty() {
            console.fail("No results found!");
        }
        println!("\nFound anime:");
        for (i, result) in results.iter().enumerate() {
            println!("{}. {}", i + 1, result.title);
        }
        let choice = prompt("\nSelect anime (number): ")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1));
        match choice.and_then(|i| results.get(i)) {
            Some(result) => result.session.clone(),
            None => console.fail("Invalid selection!"),
        }
    } else if let Some(slug) = &cli.slug {
        slug.clone()
    } else {
        console.fail("Please provide either anime name (-a) or slug (-s)!");
    };

    let episodes = match catalog::episode_list(&client, &slug).await {
        Ok(episodes) => episodes,
        Err(e) => console.fail(&format!("episode listing failed: {e}")),
    };
    if episodes.is_empty() {
        console.fail("No episodes found!");
    }

    let spec = match &cli.episodes {
        Some(spec) => spec.clone(),
        None => {
            println!("\nAvailable episodes:");
            for ep in &episodes {
                println!("Episode {}", ep.number());
            }
            match prompt("\nEnter episode number(s) (e.g. 1-3,5,7-9): ") {
                Ok(input) => input,
                Err(e) => console.fail(&format!("failed to read selection: {e}")),
            }
        }
    };
    let selected = match expand_episode_spec(&spec) {
        Ok(selected) => selected,
        Err(e) => console.fail(&format!("invalid episode selection: {e}")),
    };

    // One job per requested episode; failures are reported and the batch
    // moves on, except when the reassembly tool itself is broken.
    for number in selected {
        let Some(episode) = episodes.iter().find(|ep| ep.number() == number) else {
            console.warn(&format!("Episode {number} not found, skipping"));
            continue;
        };
        let job = DownloadJob {
            target_name: slug.clone(),
            slug: slug.clone(),
            episode_number: number,
            episode_session: episode.session.clone(),
            quality: config.quality.clone(),
        };

        console.info(&format!("Getting link for episode {number}..."));
        let locator = match download::resolve_locator(&client, &job).await {
            Ok(locator) => locator,
            Err(e) => {
                console.warn(&format!("Failed to resolve episode {number}: {e}"));
                continue;
            }
        };

        if cli.list {
            println!("{}", locator.url());
            continue;
        }

        let result = match &locator {
            StreamLocator::Playlist(_) => {
                console.info("Downloading segments...");
                download::run(&client, &config, &job, &locator, |_, _| {}).await
            }
            StreamLocator::File(_) => {
                console.info("Downloading file...");
                let mut last_percent = u64::MAX;
                let outcome = download::run(&client, &config, &job, &locator, |written, total| {
                    if let Some(total) = total.filter(|t| *t > 0) {
                        let percent = written * 100 / total;
                        if percent != last_percent {
                            last_percent = percent;
                            print!("\r{percent}%");
                            let _ = std::io::stdout().flush();
                        }
                    }
                })
                .await;
                if last_percent != u64::MAX {
                    println!();
                }
                outcome
            }
        };

        match result {
            Ok(output) => {
                console.info(&format!(
                    "Episode {number} downloaded successfully! ({})",
                    output.display()
                ));
            }
            Err(e) if e.is_episode_scoped() => {
                console.warn(&format!("Failed to download episode {number}: {e}"));
            }
            Err(e) => match e {
                PaheError::ReassemblyToolError { ref stderr } => {
                    console.fail(&format!("FFmpeg error: {stderr}"));
                }
                other => console.fail(&other.to_string()),
            },
        }
    }
}
