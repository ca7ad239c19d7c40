use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::{Credentials, Mechanism},
};
use tracing::{info, instrument};

use crate::config::SmtpSettings;
use crate::entities::Listing;
use crate::notifier::{errors::NotifyError, message::render_body};
use crate::orchestrator::Notifier;

/// Sends one email per listing through an SMTP relay.
///
/// Every message opens its own session: STARTTLS, then PLAIN or LOGIN
/// authentication. Nothing is pooled between messages.
#[derive(Clone, Debug)]
pub struct SmtpNotifier {
    settings: SmtpSettings,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn build_message(&self, subject: &str, listing: &Listing) -> Result<Message, NotifyError> {
        Ok(Message::builder()
            .from(mailbox(&self.settings.from_address)?)
            .to(mailbox(&self.settings.recipient)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(listing))?)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.server)?
                .port(self.settings.port)
                .credentials(Credentials::new(
                    self.settings.from_address.clone(),
                    self.settings.password.clone(),
                ))
                .authentication(vec![Mechanism::Plain, Mechanism::Login])
                .build(),
        )
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, listing), fields(link = %listing.post_link))]
    async fn notify(&self, subject: &str, listing: &Listing) -> Result<(), NotifyError> {
        let message = self.build_message(subject, listing)?;
        self.transport()?.send(message).await?;
        info!("Email notification sent to {}", self.settings.recipient);
        Ok(())
    }
}
