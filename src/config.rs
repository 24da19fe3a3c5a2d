use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    Mailgun,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Anything other than `json` falls back to human-readable text.
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Read before the rest of the config so startup errors are logged.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

const DEFAULT_LOG_FILTER: &str = "referral_waitlist=info,tower_http=info";

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            filter: var_or("RUST_LOG", DEFAULT_LOG_FILTER),
            format: LogFormat::parse(&var_or("LOG_FORMAT", "text")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
    pub from: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
    /// Page the sign-in link lands on.
    pub return_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferralConfig {
    pub code_prefix: String,
    pub code_length: usize,
    pub max_attempts: usize,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            code_prefix: "JUNE".into(),
            code_length: 6,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub mail: MailBackend,
    pub mailgun: Option<MailgunConfig>,
    pub link: LinkConfig,
    pub referral: ReferralConfig,
    pub site_url: String,
    pub allowed_origins: Vec<String>,
    pub listen_addr: SocketAddr,
}

const DEFAULT_ORIGINS: &str =
    "https://june.money,https://june.netlify.app,http://localhost:5173,http://localhost:3000";

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match var_or("STORE_BACKEND", "postgres").as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres,
            other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };
        let database_url = match store {
            StoreBackend::Postgres => Some(std::env::var("DATABASE_URL").context("DATABASE_URL")?),
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        let mail = match var_or("MAIL_BACKEND", "mailgun").as_str() {
            "log" => MailBackend::Log,
            "mailgun" => MailBackend::Mailgun,
            other => anyhow::bail!("unknown MAIL_BACKEND {other:?}"),
        };
        let mailgun = match mail {
            MailBackend::Mailgun => Some(MailgunConfig {
                api_key: std::env::var("MAILGUN_API_KEY").context("MAILGUN_API_KEY")?,
                domain: std::env::var("MAILGUN_DOMAIN").context("MAILGUN_DOMAIN")?,
                from: std::env::var("MAILGUN_FROM").context("MAILGUN_FROM")?,
                base_url: var_or("MAILGUN_BASE_URL", "https://api.mailgun.net"),
            }),
            MailBackend::Log => None,
        };

        let link = LinkConfig {
            secret: std::env::var("LINK_SECRET").context("LINK_SECRET")?,
            issuer: var_or("LINK_ISSUER", "june-waitlist"),
            ttl_minutes: parsed_or("LINK_TTL_MINUTES", 60),
            return_url: var_or("SIGN_IN_RETURN_URL", "https://june.money/verify"),
        };

        let defaults = ReferralConfig::default();
        let referral = ReferralConfig {
            code_prefix: var_or("REFERRAL_CODE_PREFIX", &defaults.code_prefix),
            code_length: parsed_or("REFERRAL_CODE_LENGTH", defaults.code_length),
            max_attempts: parsed_or("REFERRAL_CODE_MAX_ATTEMPTS", defaults.max_attempts),
        };
        anyhow::ensure!(referral.code_length > 0, "REFERRAL_CODE_LENGTH must be positive");
        anyhow::ensure!(referral.max_attempts > 0, "REFERRAL_CODE_MAX_ATTEMPTS must be positive");

        let allowed_origins = parse_origins(&var_or("ALLOWED_ORIGINS", DEFAULT_ORIGINS));
        let listen_addr = listen_addr(&var_or("APP_HOST", "0.0.0.0"), &var_or("PORT", "5000"))?;

        Ok(Self {
            store,
            database_url,
            mail,
            mailgun,
            link,
            referral,
            site_url: var_or("SITE_URL", "https://june.money/"),
            allowed_origins,
            listen_addr,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn listen_addr(host: &str, port: &str) -> anyhow::Result<SocketAddr> {
    let port: u16 = port
        .trim()
        .parse()
        .with_context(|| format!("PORT {port:?} is not a port number"))?;
    format!("{}:{port}", host.trim())
        .parse()
        .with_context(|| format!("APP_HOST {host:?} is not an IP address"))
}
