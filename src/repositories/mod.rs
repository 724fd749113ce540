pub(crate) mod announcements;
pub(crate) mod board;
pub(crate) mod refresh_tokens;
pub(crate) mod scores;
pub(crate) mod sessions;
pub(crate) mod students;
pub(crate) mod submissions;
pub(crate) mod topic_coach;
