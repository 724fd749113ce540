pub(crate) mod announcements;
pub(crate) mod auth;
pub(crate) mod board;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod results;
pub(crate) mod router;
pub(crate) mod sessions;
pub(crate) mod students;
pub(crate) mod submissions;
pub(crate) mod topic_coach;
