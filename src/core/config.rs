use std::collections::HashMap;
use std::{env, fs};

use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:8501",
    "http://localhost:3000",
    "https://falowen.app",
    "https://www.falowen.app",
];

const DEFAULT_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    security: SecuritySettings,
    cookies: CookieSettings,
    cors: CorsSettings,
    database: DatabaseSettings,
    redis: RedisSettings,
    youtube: YoutubeSettings,
    coursework: CourseworkSettings,
    sessions: SessionSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    host: ServerHost,
    port: ServerPort,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_v1_str: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SecuritySettings {
    pub(crate) jwt_secret: String,
    pub(crate) algorithm: String,
    pub(crate) access_token_ttl_seconds: u64,
    pub(crate) refresh_token_ttl_seconds: u64,
    /// Username to argon2 PHC hash.
    pub(crate) credentials: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct CookieSettings {
    pub(crate) name: String,
    pub(crate) same_site: String,
    pub(crate) shared_domain: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    pub(crate) postgres_server: String,
    pub(crate) postgres_port: u16,
    pub(crate) postgres_user: String,
    pub(crate) postgres_password: String,
    pub(crate) postgres_db: String,
    pub(crate) database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RedisSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) db: u16,
    pub(crate) password: String,
}

#[derive(Debug, Clone)]
pub(crate) struct YoutubeSettings {
    pub(crate) api_key: String,
    pub(crate) request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct CourseworkSettings {
    pub(crate) pass_mark: f64,
    pub(crate) min_resubmit_words: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) ttl_minutes: u64,
    pub(crate) rotate_after_minutes: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    pub(crate) fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerHost(String);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPort(u16);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
    #[error("specify only one of AUTH_USER_CREDENTIALS or AUTH_USER_CREDENTIALS_FILE")]
    ConflictingCredentials,
    #[error("invalid user credentials: {0}")]
    InvalidCredentials(String),
}

/// Source of configuration values, keyed by variable name.
pub(crate) trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        Self::load_from(&ProcessEnv)
    }

    pub(crate) fn load_from(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let vars = Vars(source);

        let host = vars.or_default("FALOWEN_HOST", "0.0.0.0");
        let port = vars.or_default("FALOWEN_PORT", "8000");

        let environment = parse_environment(
            vars.optional("FALOWEN_ENV")
                .or_else(|| vars.optional("APP_ENV"))
                .or_else(|| vars.optional("AUTH_ENV"))
                .or_else(|| vars.optional("ENVIRONMENT")),
        );
        let environment = if vars.optional("AUTH_FORCE_PRODUCTION").is_some_and(|v| parse_bool(&v))
        {
            Environment::Production
        } else {
            environment
        };
        let strict_config =
            vars.optional("FALOWEN_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = vars.or_default("PROJECT_NAME", "Falowen API");
        let version = vars.or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = vars.or_default("API_V1_STR", "/api/v1");

        let jwt_secret = load_jwt_secret(vars.optional("JWT_SECRET"), environment)?;
        let algorithm = vars.or_default("JWT_ALGORITHM", "HS256");
        let access_token_ttl_seconds =
            parse_u64("ACCESS_TOKEN_TTL_SECONDS", vars.or_default("ACCESS_TOKEN_TTL_SECONDS", "3600"))?;
        let refresh_token_ttl_seconds = parse_u64(
            "REFRESH_TOKEN_TTL_SECONDS",
            vars.or_default("REFRESH_TOKEN_TTL_SECONDS", "2592000"),
        )?;
        let credentials = load_user_credentials(
            vars.optional("AUTH_USER_CREDENTIALS"),
            vars.optional("AUTH_USER_CREDENTIALS_FILE"),
        )?;

        let cookie_name = vars.or_default("COOKIE_NAME", "session");
        let same_site = vars.or_default("COOKIE_SAMESITE", "Lax");
        let shared_domain = vars.or_default("COOKIE_SHARED_DOMAIN", "falowen.app");

        let cors_origins = parse_cors_origins(vars.optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = vars.or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", vars.or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = vars.or_default("POSTGRES_USER", "falowen");
        let postgres_password = vars.or_default("POSTGRES_PASSWORD", "");
        let postgres_db = vars.or_default("POSTGRES_DB", "falowen");
        let database_url = vars.optional("DATABASE_URL");

        let redis_host = vars.or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", vars.or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", vars.or_default("REDIS_DB", "0"))?;
        let redis_password = vars.or_default("REDIS_PASSWORD", "");

        let youtube_api_key = vars.or_default("YOUTUBE_API_KEY", "");
        let youtube_timeout =
            parse_u64("YOUTUBE_TIMEOUT_SECONDS", vars.or_default("YOUTUBE_TIMEOUT_SECONDS", "12"))?;

        let pass_mark = parse_f64("FALOWEN_PASS_MARK", vars.or_default("FALOWEN_PASS_MARK", "60"))?;
        let min_resubmit_words = parse_usize(
            "FALOWEN_MIN_RESUBMIT_WORDS",
            vars.or_default("FALOWEN_MIN_RESUBMIT_WORDS", "20"),
        )?;

        let session_ttl_minutes =
            parse_u64("SESSION_TTL_MIN", vars.or_default("SESSION_TTL_MIN", "20160"))?;
        let session_rotate_after_minutes = parse_u64(
            "SESSION_ROTATE_AFTER_MIN",
            vars.or_default("SESSION_ROTATE_AFTER_MIN", "10080"),
        )?;

        let log_level = vars.or_default("FALOWEN_LOG_LEVEL", "info");
        let json = vars.optional("FALOWEN_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            vars.optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                jwt_secret,
                algorithm,
                access_token_ttl_seconds,
                refresh_token_ttl_seconds,
                credentials,
            },
            cookies: CookieSettings { name: cookie_name, same_site, shared_domain },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            youtube: YoutubeSettings {
                api_key: youtube_api_key,
                request_timeout_seconds: youtube_timeout,
            },
            coursework: CourseworkSettings { pass_mark, min_resubmit_words },
            sessions: SessionSettings {
                ttl_minutes: session_ttl_minutes,
                rotate_after_minutes: session_rotate_after_minutes,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn youtube(&self) -> &YoutubeSettings {
        &self.youtube
    }

    pub(crate) fn coursework(&self) -> &CourseworkSettings {
        &self.coursework
    }

    pub(crate) fn sessions(&self) -> &SessionSettings {
        &self.sessions
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.coursework.pass_mark) {
            return Err(ConfigError::InvalidValue {
                field: "FALOWEN_PASS_MARK",
                value: self.coursework.pass_mark.to_string(),
            });
        }

        if !matches!(self.cookies.same_site.as_str(), "Lax" | "Strict" | "None") {
            return Err(ConfigError::InvalidValue {
                field: "COOKIE_SAMESITE",
                value: self.cookies.same_site.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.security.credentials.is_empty() {
            return Err(ConfigError::MissingSecret("AUTH_USER_CREDENTIALS"));
        }

        Ok(())
    }
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

impl RedisSettings {
    pub(crate) fn redis_url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!("redis://:{}@{}:{}/{}", self.password, self.host, self.port, self.db)
        }
    }
}

impl ServerHost {
    fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }
        Ok(Self(value))
    }
}

impl ServerPort {
    fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }
        Ok(Self(parsed))
    }
}

struct Vars<'a>(&'a dyn ConfigSource);

impl Vars<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn load_jwt_secret(value: Option<String>, environment: Environment) -> Result<String, ConfigError> {
    match value {
        Some(secret) if secret == DEFAULT_JWT_SECRET && environment.is_production() => {
            Err(ConfigError::InvalidValue { field: "JWT_SECRET", value: String::from("<default>") })
        }
        Some(secret) => Ok(secret),
        None if environment.is_production() => Err(ConfigError::MissingSecret("JWT_SECRET")),
        None => Ok(DEFAULT_JWT_SECRET.to_string()),
    }
}

fn load_user_credentials(
    inline: Option<String>,
    file: Option<String>,
) -> Result<HashMap<String, String>, ConfigError> {
    let raw = match (inline, file) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingCredentials),
        (Some(raw), None) => raw,
        (None, Some(path)) => fs::read_to_string(&path).map_err(|err| {
            ConfigError::InvalidCredentials(format!("unable to read {path}: {err}"))
        })?,
        (None, None) => return Ok(HashMap::new()),
    };

    let parsed: serde_json::Value = serde_json::from_str(&raw).map_err(|_| {
        ConfigError::InvalidCredentials("expected a JSON object of usernames to hashes".into())
    })?;
    let serde_json::Value::Object(entries) = parsed else {
        return Err(ConfigError::InvalidCredentials(
            "expected a JSON object of usernames to hashes".into(),
        ));
    };

    let mut credentials = HashMap::with_capacity(entries.len());
    for (user, value) in entries {
        let hash = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(text) => text.trim().to_string(),
            other => other.to_string(),
        };
        if hash.is_empty() {
            return Err(ConfigError::InvalidCredentials(format!("empty hash for {user}")));
        }
        credentials.insert(user, hash);
    }

    Ok(credentials)
}

fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_f64(field: &'static str, value: String) -> Result<f64, ConfigError> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue { field, value }),
    }
}

fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    };

    if raw.trim().is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    }

    Ok(items)
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|val| val.to_lowercase()) {
        Some(ref val) if matches!(val.as_str(), "production" | "prod" | "live") => {
            Environment::Production
        }
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
    }

    #[test]
    fn parse_cors_origins_json() {
        let raw = "[\"http://a\",\"http://b\"]".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors json");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_csv() {
        let raw = "http://a, http://b".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors csv");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_defaults_on_empty() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        let defaults: Vec<String> =
            DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect();
        assert_eq!(parsed, defaults);
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("live".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn defaults_load_in_development() {
        let settings = Settings::load_from(&vars(&[])).expect("settings");
        assert_eq!(settings.security().jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(settings.coursework().min_resubmit_words, 20);
        assert_eq!(settings.coursework().pass_mark, 60.0);
        assert_eq!(settings.security().access_token_ttl_seconds, 3600);
        assert_eq!(settings.server_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn production_refuses_default_jwt_secret() {
        let source = vars(&[("FALOWEN_ENV", "production"), ("JWT_SECRET", "dev-secret")]);
        let err = Settings::load_from(&source).expect_err("default secret rejected");
        assert!(matches!(err, ConfigError::InvalidValue { field: "JWT_SECRET", .. }));

        let missing = vars(&[("AUTH_FORCE_PRODUCTION", "yes")]);
        let err = Settings::load_from(&missing).expect_err("missing secret rejected");
        assert!(matches!(err, ConfigError::MissingSecret("JWT_SECRET")));
    }

    #[test]
    fn credentials_are_parsed_and_nulls_skipped() {
        let source = vars(&[(
            "AUTH_USER_CREDENTIALS",
            r#"{"alice": " $argon2id$abc ", "ghost": null}"#,
        )]);
        let settings = Settings::load_from(&source).expect("settings");
        let credentials = &settings.security().credentials;
        assert_eq!(credentials.get("alice").map(String::as_str), Some("$argon2id$abc"));
        assert!(!credentials.contains_key("ghost"));
    }

    #[test]
    fn credentials_reject_both_sources_and_empty_hashes() {
        let both = vars(&[
            ("AUTH_USER_CREDENTIALS", "{}"),
            ("AUTH_USER_CREDENTIALS_FILE", "/nonexistent.json"),
        ]);
        assert!(matches!(Settings::load_from(&both), Err(ConfigError::ConflictingCredentials)));

        let empty = vars(&[("AUTH_USER_CREDENTIALS", r#"{"bob": "  "}"#)]);
        assert!(matches!(Settings::load_from(&empty), Err(ConfigError::InvalidCredentials(_))));

        let list = vars(&[("AUTH_USER_CREDENTIALS", "[1, 2]")]);
        assert!(matches!(Settings::load_from(&list), Err(ConfigError::InvalidCredentials(_))));
    }

    #[test]
    fn pass_mark_outside_range_is_rejected() {
        let source = vars(&[("FALOWEN_PASS_MARK", "140")]);
        assert!(matches!(
            Settings::load_from(&source),
            Err(ConfigError::InvalidValue { field: "FALOWEN_PASS_MARK", .. })
        ));
    }
}
