use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use agora_core::queue::DEFAULT_EMAIL_QUEUE;

pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_email: String,
    pub sender_name: String,
}

pub struct WorkerConfig {
    pub db_path: PathBuf,
    pub queue: String,
    pub poll_interval: Duration,
    pub smtp: SmtpSettings,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| var(key).filter(|v| !v.is_empty()).ok_or_else(|| anyhow!("{} is unset", key));
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let smtp = SmtpSettings {
            server: required("AGORA_SMTP_SERVER")?,
            port: get("AGORA_SMTP_PORT", "587")
                .parse()
                .context("AGORA_SMTP_PORT is not a port number")?,
            username: required("AGORA_SMTP_USERNAME")?,
            password: required("AGORA_SMTP_PASSWORD")?,
            sender_email: required("AGORA_SMTP_SENDER_EMAIL")?,
            sender_name: get("AGORA_SMTP_SENDER_NAME", "Agora"),
        };
        let poll_ms: u64 = get("AGORA_WORKER_POLL_MS", "1000")
            .parse()
            .context("AGORA_WORKER_POLL_MS is not a number")?;

        Ok(Self {
            db_path: get("AGORA_DB_PATH", "agora.db").into(),
            queue: get("AGORA_EMAIL_QUEUE", DEFAULT_EMAIL_QUEUE),
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            smtp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_env(key: &str) -> Option<String> {
        match key {
            "AGORA_SMTP_SERVER" => Some("smtp.example.com".into()),
            "AGORA_SMTP_USERNAME" => Some("mailer".into()),
            "AGORA_SMTP_PASSWORD" => Some("hunter22".into()),
            "AGORA_SMTP_SENDER_EMAIL" => Some("noreply@example.com".into()),
            _ => None,
        }
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = WorkerConfig::from_lookup(smtp_env).unwrap();
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.queue, "email_queue");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn missing_smtp_server_is_an_error() {
        let result = WorkerConfig::from_lookup(|key| match key {
            "AGORA_SMTP_SERVER" => None,
            other => smtp_env(other),
        });
        assert!(result.is_err());
    }
}
