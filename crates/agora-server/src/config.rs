use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use agora_core::queue::DEFAULT_EMAIL_QUEUE;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me", "secret"];

pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub password_pepper: String,
    pub public_url: String,
    pub web_root: PathBuf,
    pub email_queue: String,
    pub admin: Option<AdminAccount>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("AGORA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("AGORA_JWT_SECRET is unset or still a placeholder");
        }
        let password_pepper = var("AGORA_PASSWORD_PEPPER").unwrap_or_default();
        if password_pepper.is_empty() {
            bail!("AGORA_PASSWORD_PEPPER is unset");
        }

        let host = get("AGORA_HOST", "0.0.0.0");
        let port: u16 = get("AGORA_PORT", "3000").parse().context("AGORA_PORT is not a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let admin = match (
            var("AGORA_ADMIN_USERNAME"),
            var("AGORA_ADMIN_EMAIL"),
            var("AGORA_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminAccount { username, email, password }),
            (None, None, None) => None,
            _ => bail!("AGORA_ADMIN_USERNAME, AGORA_ADMIN_EMAIL and AGORA_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            addr,
            db_path: get("AGORA_DB_PATH", "agora.db").into(),
            jwt_secret,
            password_pepper,
            public_url: get("AGORA_PUBLIC_URL", "https://localhost:7070"),
            web_root: get("AGORA_WEB_ROOT", "./wwwroot").into(),
            email_queue: get("AGORA_EMAIL_QUEUE", DEFAULT_EMAIL_QUEUE),
            admin,
        })
    }
}
