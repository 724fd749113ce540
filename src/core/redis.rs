use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{Client, RedisError, Script};
use tokio::sync::RwLock;

const WINDOW_SCRIPT: &str = r#"
local current = redis.call("INCR", KEYS[1])
if current == 1 then
    redis.call("EXPIRE", KEYS[1], ARGV[1])
end
return current
"#;

/// Attempts allowed per subject within a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RateLimit {
    pub(crate) max_attempts: u64,
    pub(crate) window_seconds: u64,
}

impl RateLimit {
    pub(crate) const LOGIN: RateLimit = RateLimit { max_attempts: 10, window_seconds: 60 };
}

/// Redis is only used for throttling. Without a connection every attempt is
/// allowed.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHealth {
    pub(crate) fn label(&self) -> String {
        match self {
            RedisHealth::Healthy => "healthy".to_string(),
            RedisHealth::Disconnected => "disconnected".to_string(),
            RedisHealth::Unhealthy(error) => format!("unhealthy: {error}"),
        }
    }

    pub(crate) fn is_degraded(&self) -> bool {
        matches!(self, RedisHealth::Unhealthy(_))
    }
}

fn throttle_key(scope: &str, subject: &str) -> String {
    format!("rl:{scope}:{}", subject.trim().to_lowercase())
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let manager = ConnectionManager::new(Client::open(self.url.as_str())?).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        self.manager.write().await.take();
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.connection().await else {
            return RedisHealth::Disconnected;
        };

        match redis::cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Count one attempt by `subject` under `scope`. Redis errors fail open.
    pub(crate) async fn allow_attempt(&self, scope: &str, subject: &str, limit: RateLimit) -> bool {
        let Some(mut manager) = self.connection().await else {
            return true;
        };

        let key = throttle_key(scope, subject);
        let counted: Result<i64, RedisError> = Script::new(WINDOW_SCRIPT)
            .key(&key)
            .arg(limit.window_seconds)
            .invoke_async(&mut manager)
            .await;

        match counted {
            Ok(current) => u64::try_from(current).map_or(true, |n| n <= limit.max_attempts),
            Err(err) => {
                tracing::warn!(scope, error = %err, "Rate limit check failed; allowing attempt");
                true
            }
        }
    }
}
