use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const INSECURE_SSL_ENV: &str = "TOURMAG_SCRAPER_INSECURE_SSL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid HOST {0:?}")]
    Host(String),
    #[error("invalid PORT {0:?}")]
    Port(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub fetch_timeout: Duration,
    pub insecure_ssl: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            fetch_timeout: FETCH_TIMEOUT,
            insecure_ssl: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.trim().parse().map_err(|_| ConfigError::Host(host.clone()))?;

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Port(raw))?,
            None => DEFAULT_PORT,
        };

        let insecure_ssl = matches!(lookup(INSECURE_SSL_ENV).as_deref(), Some("1"));

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            insecure_ssl,
            ..Self::default()
        })
    }

    /// Build the outbound client shared by every extraction.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"),
        );

        let mut builder = reqwest::ClientBuilder::new()
            .timeout(self.fetch_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers);

        if self.insecure_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build()
    }
}
