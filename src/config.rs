use crate::bus::DEFAULT_SUBJECT_PATTERN;
use crate::notification::pusher::PusherConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Redis instance used as the event bus.
    pub redis_url: String,
    pub database_url: String,
    /// Wildcard subject the worker subscribes to.
    /// Set via NOTIF_SUBJECT_PATTERN. Default: notifications.*.*
    pub subject_pattern: String,
    /// Port of the read API. Set via NOTIF_API_PORT. Default: 8080.
    pub api_port: u16,
    /// When set, the read API requires a matching X-Admin-Key header.
    pub admin_key: Option<String>,
    /// Real-time fan-out; `None` unless PUSHER_APP_ID, PUSHER_KEY and
    /// PUSHER_SECRET are all set.
    pub pusher: Option<PusherConfig>,
    /// "development" or "production". Set via ENVIRONMENT.
    pub environment: String,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build the config from an arbitrary variable source. Empty values count
/// as unset.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let pusher = match (var("PUSHER_APP_ID"), var("PUSHER_KEY"), var("PUSHER_SECRET")) {
        (Some(app_id), Some(key), Some(secret)) => Some(PusherConfig {
            app_id,
            key,
            secret,
            cluster: var("PUSHER_CLUSTER").unwrap_or_else(|| "mt1".into()),
            host: var("PUSHER_HOST"),
        }),
        _ => None,
    };

    let config = Config {
        redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".into()),
        database_url: var("DATABASE_URL")
            .unwrap_or_else(|| "postgres://localhost/notifications".into()),
        subject_pattern: var("NOTIF_SUBJECT_PATTERN")
            .unwrap_or_else(|| DEFAULT_SUBJECT_PATTERN.into()),
        api_port: match var("NOTIF_API_PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIF_API_PORT is not a valid port: {}", v))?,
            None => 8080,
        },
        admin_key: var("NOTIF_ADMIN_KEY"),
        pusher,
        environment: var("ENVIRONMENT").unwrap_or_else(|| "development".into()),
    };

    if !config.subject_pattern.starts_with("notifications.") {
        anyhow::bail!(
            "NOTIF_SUBJECT_PATTERN must cover the notifications.* subjects, got '{}'",
            config.subject_pattern
        );
    }

    if config.is_production() && config.admin_key.is_none() {
        tracing::warn!("NOTIF_ADMIN_KEY is not set; the read API is unauthenticated");
    }

    Ok(config)
}
