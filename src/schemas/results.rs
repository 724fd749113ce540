use serde::Serialize;

use crate::services::leaderboard::LeaderboardEntry;
use crate::services::youtube::Video;

#[derive(Debug, Serialize)]
pub(crate) struct LeaderboardResponse {
    pub(crate) level: String,
    pub(crate) entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoListResponse {
    pub(crate) level: String,
    pub(crate) videos: Vec<Video>,
}
