use chrono::Duration;
use log::{info, warn};
use std::{env, fmt::Display, str::FromStr};

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub interactive_key: Option<String>,
    pub admin_profile_ids: Vec<String>,
    pub vote_lock_window: Duration,
    pub init_lock_window: Duration,
    pub lock_sweep_interval_secs: u64,
    pub node_env: Option<String>,
    pub instance_domain: Option<String>,
    pub s3_bucket: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            host: try_load("HOST", "0.0.0.0"),
            port: try_load("PORT", "3000"),
            database_url: try_load("DATABASE_URL", "sqlite:asset_poll.db"),
            interactive_key: optional("INTERACTIVE_KEY"),
            admin_profile_ids: optional("ADMIN_PROFILE_IDS")
                .map(|ids| parse_list(&ids))
                .unwrap_or_default(),
            vote_lock_window: Duration::seconds(try_load("VOTE_LOCK_WINDOW_SECS", "10")),
            init_lock_window: Duration::seconds(try_load("INIT_LOCK_WINDOW_SECS", "60")),
            lock_sweep_interval_secs: try_load("LOCK_SWEEP_INTERVAL_SECS", "60"),
            node_env: optional("NODE_ENV"),
            instance_domain: optional("INSTANCE_DOMAIN"),
            s3_bucket: optional("S3_BUCKET"),
        }
    }

    pub fn is_admin(&self, profile_id: &str) -> bool {
        self.admin_profile_ids.iter().any(|id| id == profile_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite:asset_poll.db".to_string(),
            interactive_key: None,
            admin_profile_ids: Vec::new(),
            vote_lock_window: Duration::seconds(10),
            init_lock_window: Duration::seconds(60),
            lock_sweep_interval_secs: 60,
            node_env: None,
            instance_domain: None,
            s3_bucket: None,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {} value {:?}: {}, using default: {}", key, raw, e, default);
            parse_default(key, default)
        }
    }
}

// Defaults are literals in this file, so a failure here is a programming error
fn parse_default<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    default
        .parse()
        .unwrap_or_else(|e| panic!("Default for {} does not parse: {}", key, e))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
