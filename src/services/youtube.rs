use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::metrics;

const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";
const PAGE_SIZE: &str = "50";
// A page loop that never yields an empty token is cut off here.
const MAX_PAGES: usize = 40;

const A1_PLAYLISTS: &[&str] = &["PL5vnwpT4NVTdwFarD9kwm1HONsqQ11l-b"];
const A2_PLAYLISTS: &[&str] = &[
    "PLs7zUO7VPyJ7YxTq_g2Rcl3Jthd5bpTdY",
    "PLquImyRfMt6dVHL4MxFXMILrFh86H_HAc",
    "PLs7zUO7VPyJ5Eg0NOtF9g-RhqA25v385c",
];
const B1_PLAYLISTS: &[&str] = &["PLs7zUO7VPyJ5razSfhOUVbTv9q6SAuPx-", "PLB92CD6B288E5DB61"];
const B2_PLAYLISTS: &[&str] = &[
    "PLs7zUO7VPyJ5XMfT7pLvweRx6kHVgP_9C",
    "PLs7zUO7VPyJ6jZP-s6dlkINuEjFPvKMG0",
    "PLs7zUO7VPyJ4SMosRdB-35Q07brhnVToY",
];

pub(crate) fn playlist_ids(level: &str) -> &'static [&'static str] {
    match level.trim().to_ascii_uppercase().as_str() {
        "A1" => A1_PLAYLISTS,
        "A2" => A2_PLAYLISTS,
        "B1" => B1_PLAYLISTS,
        "B2" => B2_PLAYLISTS,
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Video {
    pub(crate) title: String,
    pub(crate) url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

impl PlaylistPage {
    fn into_videos(self) -> (Vec<Video>, Option<String>) {
        let videos = self
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.snippet.resource_id.video_id?;
                Some(Video {
                    title: item.snippet.title,
                    url: format!("https://www.youtube.com/watch?v={id}"),
                })
            })
            .collect();
        let next = self.next_page_token.filter(|token| !token.is_empty());
        (videos, next)
    }
}

async fn fetch_pages(client: &Client, api_key: &str, playlist_id: &str) -> Result<Vec<Video>> {
    let mut videos = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let mut request = client.get(PLAYLIST_ITEMS_URL).query(&[
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", PAGE_SIZE),
            ("key", api_key),
        ]);
        if let Some(token) = page_token.as_deref() {
            request = request.query(&[("pageToken", token)]);
        }

        let page: PlaylistPage = request
            .send()
            .await
            .context("Failed to call YouTube playlistItems API")?
            .error_for_status()
            .context("YouTube playlistItems API returned an error status")?
            .json()
            .await
            .context("Failed to decode YouTube playlistItems response")?;

        let (mut batch, next) = page.into_videos();
        videos.append(&mut batch);

        match next {
            Some(token) => page_token = Some(token),
            None => return Ok(videos),
        }
    }

    tracing::warn!(playlist_id, pages = MAX_PAGES, "YouTube playlist paging stopped early");
    Ok(videos)
}

/// Videos of one playlist. Without an API key or on any upstream failure the
/// list is empty.
pub(crate) async fn fetch_playlist_videos(
    client: &Client,
    api_key: &str,
    playlist_id: &str,
) -> Vec<Video> {
    if api_key.trim().is_empty() {
        tracing::debug!(playlist_id, "YouTube API key not configured; skipping fetch");
        return Vec::new();
    }

    match fetch_pages(client, api_key, playlist_id).await {
        Ok(videos) => videos,
        Err(err) => {
            tracing::warn!(playlist_id, error = %err, "YouTube playlist fetch failed");
            metrics::record_external_fallback("youtube");
            Vec::new()
        }
    }
}

pub(crate) async fn fetch_level_videos(client: &Client, api_key: &str, level: &str) -> Vec<Video> {
    let mut videos = Vec::new();
    for playlist_id in playlist_ids(level) {
        videos.extend(fetch_playlist_videos(client, api_key, playlist_id).await);
    }
    videos
}
