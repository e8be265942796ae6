use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("BLOG_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("BLOG_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("BLOG_PORT must be a port number")?;
        let db_path: PathBuf = var("BLOG_DB_PATH")
            .unwrap_or_else(|| "blog.db".into())
            .into();
        let ttl_hours: u64 = var("BLOG_SESSION_TTL_HOURS")
            .unwrap_or_else(|| "168".into()) // 7 days
            .parse()
            .context("BLOG_SESSION_TTL_HOURS must be a number of hours")?;
        let ttl_secs = ttl_hours
            .checked_mul(60 * 60)
            .context("BLOG_SESSION_TTL_HOURS is too large")?;
        let cookie_secure = matches!(
            var("BLOG_COOKIE_SECURE").as_deref(),
            Some("1") | Some("true") | Some("yes")
        );

        Ok(Self {
            host,
            port,
            db_path,
            session_ttl: Duration::from_secs(ttl_secs),
            cookie_secure,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn config(host: &str) -> Config {
        Config {
            host: host.into(),
            port: 5000,
            db_path: "blog.db".into(),
            session_ttl: Duration::from_secs(60),
            cookie_secure: false,
        }
    }

    #[test]
    fn addr_joins_host_and_port() {
        assert_eq!(config("127.0.0.1").addr().unwrap().port(), 5000);
        assert!(config("not a host").addr().is_err());
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.session_ttl, Duration::from_secs(168 * 3600));
        assert!(!config.cookie_secure);
    }

    #[test]
    fn session_ttl_is_read_in_hours() {
        let config = from_vars(&[("BLOG_SESSION_TTL_HOURS", "2"), ("BLOG_COOKIE_SECURE", "true")]).unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(7200));
        assert!(config.cookie_secure);
    }

    #[test]
    fn bad_session_ttl_is_rejected() {
        assert!(from_vars(&[("BLOG_SESSION_TTL_HOURS", "a week")]).is_err());
        assert!(from_vars(&[("BLOG_SESSION_TTL_HOURS", "-1")]).is_err());
        assert!(from_vars(&[("BLOG_PORT", "http")]).is_err());
    }

    #[test]
    fn overflowing_session_ttl_is_rejected() {
        let max = u64::MAX.to_string();
        let err = from_vars(&[("BLOG_SESSION_TTL_HOURS", max.as_str())]).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
