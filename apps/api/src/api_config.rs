use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use keyward_core::AppError;
use keyward_domain::SystemLeaseLimits;
use keyward_infrastructure::DEFAULT_RAM_ENDPOINT;
use tracing_subscriber::EnvFilter;
use url::Url;

const MIN_OPERATOR_TOKEN_LENGTH: usize = 32;

#[derive(Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub operator_token: String,
    pub lease_limits: SystemLeaseLimits,
    pub ram_endpoint: Url,
    pub remote_timeout: Duration,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let operator_token = required_non_empty(&lookup, "KEYWARD_OPERATOR_TOKEN")?;
        if operator_token.len() < MIN_OPERATOR_TOKEN_LENGTH {
            return Err(AppError::Validation(format!(
                "KEYWARD_OPERATOR_TOKEN must be at least {MIN_OPERATOR_TOKEN_LENGTH} characters"
            )));
        }

        let api_host = lookup("KEYWARD_API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&lookup, "KEYWARD_API_PORT", 8200_u16)?;

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
            migrate_only,
            database_url,
            api_host,
            api_port,
            operator_token,
            lease_limits,
            ram_endpoint,
            remote_timeout,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!(
                "invalid KEYWARD_API_HOST '{}': {error}",
                self.api_host
            ))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
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

fn required_non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, AppError> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
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
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use keyward_core::AppError;

    use super::ApiConfig;

    const TOKEN: &str = "operator-token-0123456789abcdef0123";

    fn load(pairs: &[(&str, &str)], migrate_only: bool) -> Result<ApiConfig, AppError> {
        let values = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        ApiConfig::from_lookup(migrate_only, |name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_optional_variables() {
        let config = load(&[("KEYWARD_OPERATOR_TOKEN", TOKEN)], false);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.database_url, None);
        assert_eq!(config.api_port, 8200);
        assert_eq!(
            config.lease_limits.default_lease_ttl(),
            Duration::from_secs(3600)
        );
        assert_eq!(config.ram_endpoint.as_str(), "https://ram.aliyuncs.com/");
        assert_eq!(config.remote_timeout, Duration::from_secs(15));
    }

    #[test]
    fn short_operator_token_is_rejected() {
        let config = load(&[("KEYWARD_OPERATOR_TOKEN", "short")], false);
        assert!(matches!(config, Err(AppError::Validation(_))));
    }

    #[test]
    fn default_ttl_above_max_is_rejected() {
        let config = load(
            &[
                ("KEYWARD_OPERATOR_TOKEN", TOKEN),
                ("KEYWARD_DEFAULT_LEASE_TTL_SECONDS", "7200"),
                ("KEYWARD_MAX_LEASE_TTL_SECONDS", "3600"),
            ],
            false,
        );
        assert!(matches!(config, Err(AppError::Validation(_))));
    }

    #[test]
    fn migrate_requires_database_url() {
        let config = load(&[("KEYWARD_OPERATOR_TOKEN", TOKEN)], true);
        assert!(matches!(config, Err(AppError::Validation(_))));
    }

    #[test]
    fn invalid_port_is_reported() {
        let config = load(
            &[
                ("KEYWARD_OPERATOR_TOKEN", TOKEN),
                ("KEYWARD_API_PORT", "eighty"),
            ],
            false,
        );
        assert!(matches!(
            config,
            Err(AppError::Validation(message)) if message.contains("KEYWARD_API_PORT")
        ));
    }
}
