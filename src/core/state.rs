use std::sync::Arc;
use std::time::Duration;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::db::DocumentStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn DocumentStore>,
    redis: RedisHandle,
    http: reqwest::Client,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        redis: RedisHandle,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.youtube().request_timeout_seconds))
            .build()?;
        Ok(Self { inner: Arc::new(InnerState { settings, store, redis, http }) })
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }
}
