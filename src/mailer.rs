#![cfg(not(tarpaulin_include))]

use crate::config::SmtpSettings;
use crate::roster::Identity;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use log::info;
use std::error::Error;

pub struct Mailer {
    smtp: SmtpTransport,
    from: String,
}

impl Mailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, Box<dyn Error>> {
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());

        let tls_parameters = TlsParameters::new(settings.relay.clone())?;

        let smtp = SmtpTransport::relay(&settings.relay)?
            .credentials(creds)
            .port(settings.port)
            .tls(Tls::Wrapper(tls_parameters))
            .build();

        Ok(Mailer {
            smtp,
            from: settings.from.clone(),
        })
    }

    /// Mail an identity its own credential; the identity must have an email.
    pub fn send_credential(&self, identity: &Identity) -> Result<(), Box<dyn Error>> {
        let to = identity
            .email
            .as_deref()
            .ok_or("identity has no email address")?;

        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject("Your Intern ID")
            .body(credential_body(identity))?;

        self.smtp.send(&email)?;
        info!("sent credential reminder to {}", to);
        Ok(())
    }
}

pub fn credential_body(identity: &Identity) -> String {
    format!(
        "Hello {},\n\nYour Intern ID is: {}\nUse it together with your name to log activities and view your history.\n",
        identity.canonical_name, identity.credential_id
    )
}
