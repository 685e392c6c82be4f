use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How incoming JWTs are verified.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// Shared HS256 project secret.
    Secret(String),
    /// ES256 keys fetched from the project's JWKS endpoint.
    Jwks {
        project_ref: String,
        anon_key: String,
    },
}

/// Process-wide settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub auth: AuthConfig,
    pub hire_timeout: Duration,
    pub user_cache_ttl: Duration,
    pub gig_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let redis_url = optional("REDIS_URL");

        let port = match optional("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => 8080,
        };

        let hire_timeout = positive_secs(
            "HIRE_TIMEOUT_SECS",
            optional("HIRE_TIMEOUT_SECS").as_deref(),
            10,
        )?;

        Ok(Self {
            database_url,
            redis_url,
            port,
            auth: auth_from_env()?,
            hire_timeout,
            user_cache_ttl: parse_duration_secs("CACHE_TTL_USERS", 300),
            gig_cache_ttl: parse_duration_secs("CACHE_TTL_GIG_DETAIL", 600),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn auth_from_env() -> Result<AuthConfig, ConfigError> {
    if let Some(secret) = optional("SUPABASE_JWT_SECRET") {
        return Ok(AuthConfig::Secret(secret));
    }

    let supabase_url = required("SUPABASE_URL")?;
    let project_ref = project_ref_from_url(&supabase_url).ok_or_else(|| ConfigError::Invalid {
        name: "SUPABASE_URL",
        reason: "expected https://PROJECT.supabase.co".to_string(),
    })?;

    Ok(AuthConfig::Jwks {
        project_ref,
        anon_key: required("SUPABASE_ANON_KEY")?,
    })
}

fn project_ref_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .strip_prefix("https://")
        .and_then(|s| s.strip_suffix(".supabase.co"))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_duration_secs(env_var: &str, default: u64) -> Duration {
    env::var(env_var)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

/// A whole number of seconds, at least one. A zero hire timeout would fail
/// every hire, so it is a configuration error rather than a default.
fn positive_secs(
    name: &'static str,
    raw: Option<&str>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            reason: "must be at least 1 second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: format!("{e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_ref_is_extracted_from_supabase_url() {
        assert_eq!(
            project_ref_from_url("https://abcd1234.supabase.co"),
            Some("abcd1234".to_string())
        );
        assert_eq!(
            project_ref_from_url("https://abcd1234.supabase.co/"),
            Some("abcd1234".to_string())
        );
        assert_eq!(project_ref_from_url("http://abcd1234.supabase.co"), None);
        assert_eq!(project_ref_from_url("https://.supabase.co"), None);
    }

    #[test]
    fn hire_timeout_must_be_a_positive_number_of_seconds() {
        assert_eq!(
            positive_secs("HIRE_TIMEOUT_SECS", None, 10).unwrap(),
            Duration::from_secs(10)
        );
        assert_eq!(
            positive_secs("HIRE_TIMEOUT_SECS", Some("5"), 10).unwrap(),
            Duration::from_secs(5)
        );
        assert!(matches!(
            positive_secs("HIRE_TIMEOUT_SECS", Some("0"), 10),
            Err(ConfigError::Invalid { name: "HIRE_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            positive_secs("HIRE_TIMEOUT_SECS", Some("soon"), 10),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
