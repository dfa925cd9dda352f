use std::future::Future;

use anyhow::Result;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use agora_types::email::EmailJob;

use crate::config::SmtpSettings;

pub trait Mailer: Send + Sync {
    fn send(&self, job: &EmailJob) -> impl Future<Output = Result<()>> + Send;
}

/// Delivers HTML mail through an SMTP relay, STARTTLS required.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let sender = Mailbox::new(Some(settings.sender_name.clone()), settings.sender_email.parse()?);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
            .port(settings.port)
            .credentials(Credentials::new(settings.username.clone(), settings.password.clone()))
            .build();

        info!("SMTP relay {}:{} as {}", settings.server, settings.port, sender);
        Ok(Self { transport, sender })
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, job: &EmailJob) -> Result<()> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(job.to_email.parse()?)
            .subject(job.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(job.body.clone())?;

        self.transport.send(message).await?;
        Ok(())
    }
}
