pub(crate) mod currency;
pub(crate) mod leaderboard;
pub(crate) mod receipt;
pub(crate) mod lesson_keys;
pub(crate) mod resubmit;
pub(crate) mod session_state;
pub(crate) mod submission_dates;
pub(crate) mod submission_flow;
pub(crate) mod submit_status;
pub(crate) mod youtube;
