use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DROPDOWN_LIMIT: usize = 20;
pub const DEFAULT_TASK_DUE_SOON_MINUTES: i64 = 24 * 60;
pub const DEFAULT_VIEW_MILESTONES: [u64; 6] = [10, 50, 100, 250, 500, 1000];
pub const DEFAULT_DISPATCH_QUEUE_CAPACITY: usize = 1024;

// Back-office configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct BackofficeConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub notifications: NotificationConfig,
    pub feed_queue_capacity: usize,
    pub internal: InternalConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_ms() -> u64 {
    5_000
}

/// Tunables for notification generation and the dropdown page.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    pub dropdown_limit: usize,
    pub task_due_soon: Duration,
    /// Ascending, deduplicated view thresholds.
    pub view_milestones: Vec<u64>,
    pub dispatch_queue_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dropdown_limit: DEFAULT_DROPDOWN_LIMIT,
            task_due_soon: Duration::from_secs(DEFAULT_TASK_DUE_SOON_MINUTES as u64 * 60),
            view_milestones: DEFAULT_VIEW_MILESTONES.to_vec(),
            dispatch_queue_capacity: DEFAULT_DISPATCH_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InternalConfig {
    pub enabled: bool,
    pub bind_addr: SocketAddr,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackofficeConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    dropdown_limit: Option<usize>,
    task_due_soon_minutes: Option<i64>,
    view_milestones: Option<Vec<u64>>,
    dispatch_queue_capacity: Option<usize>,
    feed_queue_capacity: Option<usize>,
    internal_enabled: Option<bool>,
    internal_bind: Option<String>,
    internal_token: Option<String>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("parse {name}")),
        Err(_) => Ok(default),
    }
}

fn parse_milestones(value: &str) -> Result<Vec<u64>> {
    let mut milestones = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .with_context(|| format!("invalid view milestone: {part}"))
        })
        .collect::<Result<Vec<_>>>()?;
    normalize_milestones(&mut milestones)?;
    Ok(milestones)
}

fn normalize_milestones(milestones: &mut Vec<u64>) -> Result<()> {
    milestones.sort_unstable();
    milestones.dedup();
    if milestones.contains(&0) {
        bail!("view milestones must be positive");
    }
    Ok(())
}

fn task_due_soon(minutes: i64) -> Result<Duration> {
    if minutes <= 0 {
        bail!("task due-soon window must be positive, got {minutes} minutes");
    }
    Ok(Duration::from_secs(minutes as u64 * 60))
}

fn positive(name: &str, value: usize) -> Result<usize> {
    if value == 0 {
        bail!("{name} must be greater than zero");
    }
    Ok(value)
}

impl BackofficeConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("REALTY_BIND", "0.0.0.0:8080")
            .parse()
            .with_context(|| "parse REALTY_BIND")?;
        let metrics_bind = env_or("REALTY_METRICS_BIND", "0.0.0.0:9090")
            .parse()
            .with_context(|| "parse REALTY_METRICS_BIND")?;
        let storage = env_or("REALTY_STORAGE_BACKEND", "memory")
            .parse()
            .with_context(|| "parse REALTY_STORAGE_BACKEND")?;
        let postgres = match std::env::var("REALTY_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse(
                    "REALTY_POSTGRES_MAX_CONNECTIONS",
                    default_max_connections(),
                )?,
                connect_timeout_ms: env_parse(
                    "REALTY_POSTGRES_CONNECT_TIMEOUT_MS",
                    default_timeout_ms(),
                )?,
                acquire_timeout_ms: env_parse(
                    "REALTY_POSTGRES_ACQUIRE_TIMEOUT_MS",
                    default_timeout_ms(),
                )?,
            }),
            Err(_) => None,
        };
        let notifications = NotificationConfig {
            dropdown_limit: positive(
                "REALTY_DROPDOWN_LIMIT",
                env_parse("REALTY_DROPDOWN_LIMIT", DEFAULT_DROPDOWN_LIMIT)?,
            )?,
            task_due_soon: task_due_soon(env_parse(
                "REALTY_TASK_DUE_SOON_MINUTES",
                DEFAULT_TASK_DUE_SOON_MINUTES,
            )?)?,
            view_milestones: match std::env::var("REALTY_VIEW_MILESTONES") {
                Ok(value) => parse_milestones(&value).with_context(|| "parse REALTY_VIEW_MILESTONES")?,
                Err(_) => DEFAULT_VIEW_MILESTONES.to_vec(),
            },
            dispatch_queue_capacity: positive(
                "REALTY_DISPATCH_QUEUE_CAPACITY",
                env_parse(
                    "REALTY_DISPATCH_QUEUE_CAPACITY",
                    DEFAULT_DISPATCH_QUEUE_CAPACITY,
                )?,
            )?,
        };
        let feed_queue_capacity = positive(
            "REALTY_FEED_QUEUE_CAPACITY",
            env_parse(
                "REALTY_FEED_QUEUE_CAPACITY",
                realty_feed::DEFAULT_QUEUE_CAPACITY,
            )?,
        )?;
        let internal = InternalConfig {
            enabled: env_parse("REALTY_INTERNAL_ENABLED", false)?,
            bind_addr: env_or("REALTY_INTERNAL_BIND", "127.0.0.1:8081")
                .parse()
                .with_context(|| "parse REALTY_INTERNAL_BIND")?,
            token: std::env::var("REALTY_INTERNAL_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            notifications,
            feed_queue_capacity,
            internal,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("REALTY_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read REALTY_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: BackofficeConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse backoffice config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.dropdown_limit {
            self.notifications.dropdown_limit = positive("dropdown_limit", value)?;
        }
        if let Some(value) = override_cfg.task_due_soon_minutes {
            self.notifications.task_due_soon = task_due_soon(value)?;
        }
        if let Some(mut value) = override_cfg.view_milestones {
            normalize_milestones(&mut value)?;
            self.notifications.view_milestones = value;
        }
        if let Some(value) = override_cfg.dispatch_queue_capacity {
            self.notifications.dispatch_queue_capacity =
                positive("dispatch_queue_capacity", value)?;
        }
        if let Some(value) = override_cfg.feed_queue_capacity {
            self.feed_queue_capacity = positive("feed_queue_capacity", value)?;
        }
        if let Some(value) = override_cfg.internal_enabled {
            self.internal.enabled = value;
        }
        if let Some(value) = override_cfg.internal_bind {
            self.internal.bind_addr = value.parse().with_context(|| "parse internal_bind")?;
        }
        if let Some(value) = override_cfg.internal_token {
            self.internal.token = Some(value);
        }
        Ok(())
    }
}
