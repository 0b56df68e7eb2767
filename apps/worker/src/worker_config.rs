use std::env;
use std::str::FromStr;
use std::time::Duration;

use keyward_core::AppError;
use keyward_domain::SystemLeaseLimits;
use keyward_infrastructure::DEFAULT_RAM_ENDPOINT;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub worker_id: String,
    pub sweep_interval: Duration,
    pub sweep_lock_seconds: u32,
    pub lease_limits: SystemLeaseLimits,
    pub ram_endpoint: Url,
    pub remote_timeout: Duration,
}

impl WorkerConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
        let redis_url = lookup("REDIS_URL").filter(|value| !value.trim().is_empty());
        let worker_id = lookup("KEYWARD_WORKER_ID")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));

        let sweep_interval_ms = parse_or(&lookup, "KEYWARD_SWEEP_INTERVAL_MS", 5000_u64)?;
        if sweep_interval_ms == 0 {
            return Err(AppError::Validation(
                "KEYWARD_SWEEP_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        let sweep_lock_seconds = parse_or(&lookup, "KEYWARD_SWEEP_LEASE_SECONDS", 30_u32)?;
        if sweep_lock_seconds == 0 {
            return Err(AppError::Validation(
                "KEYWARD_SWEEP_LEASE_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let lease_limits = SystemLeaseLimits::new(
            Duration::from_secs(parse_or(&lookup, "KEYWARD_DEFAULT_LEASE_TTL_SECONDS", 3600_u64)?),
            Duration::from_secs(parse_or(&lookup, "KEYWARD_MAX_LEASE_TTL_SECONDS", 86_400_u64)?),
        )?;

        let ram_endpoint = lookup("KEYWARD_RAM_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_RAM_ENDPOINT.to_owned());
        let ram_endpoint = Url::parse(ram_endpoint.as_str()).map_err(|error| {
            AppError::Validation(format!("invalid KEYWARD_RAM_ENDPOINT: {error}"))
        })?;

        let remote_timeout = Duration::from_secs(parse_or(
            &lookup,
            "KEYWARD_REMOTE_TIMEOUT_SECONDS",
            15_u64,
        )?);

        Ok(Self {
            database_url,
            redis_url,
            worker_id,
            sweep_interval: Duration::from_millis(sweep_interval_ms),
            sweep_lock_seconds,
            lease_limits,
            ram_endpoint,
            remote_timeout,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
