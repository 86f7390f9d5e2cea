/*
 * client.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Corriere, an asynchronous IMAP and SMTP client library.
 *
 * Corriere is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Corriere is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Corriere.  If not, see <http://www.gnu.org/licenses/>.
 */
//! SMTP client facade: greeting, EHLO, STARTTLS, AUTH and the mail transaction.

use std::sync::Mutex;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::commands::*;
use super::response::SmtpReply;
use super::Smtp;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::error::CommandError;
use crate::net::{MailStream, Security};
use crate::sasl::SaslMechanism;
use crate::session::Session;

/// One SMTP connection. Each call through `&self` runs to completion before the next one
/// starts; a mail transaction or a STARTTLS upgrade is never interleaved with other commands.
pub struct SmtpClient<S = MailStream> {
    session: Session<Smtp, S>,
    /// Held for the whole of each public operation.
    exclusive: AsyncMutex<()>,
    host: String,
    ehlo_domain: String,
    greeting: SmtpReply,
    capabilities: Mutex<Option<EhloCapabilities>>,
}

impl SmtpClient<MailStream> {
    /// Connect to `host:port`, read the greeting and send EHLO. With [`Security::StartTls`]
    /// the session is upgraded (and EHLO repeated) before returning.
    pub async fn connect(
        host: &str,
        port: u16,
        security: Security,
        config: &ClientConfig,
    ) -> Result<Self, CommandError> {
        info!(host, port, ?security, "connecting to SMTP server");
        let stream = MailStream::connect(host, port, security, config.connect_timeout).await?;
        let client = Self::from_stream(stream, host, config).await?;
        client.ehlo().await?;
        if security == Security::StartTls {
            client.starttls().await?;
        }
        Ok(client)
    }

    /// STARTTLS, TLS handshake, then a fresh EHLO (RFC 3207 4.2: earlier extensions are void).
    pub async fn starttls(&self) -> Result<EhloCapabilities, CommandError> {
        let _exclusive = self.exclusive.lock().await;
        let offered = self
            .capabilities()
            .map(|c| c.starttls)
            .unwrap_or(true);
        if !offered {
            return Err(CommandError::invalid("server does not offer STARTTLS"));
        }
        if !self.session.execute(StartTlsCommand).await? {
            return Err(CommandError::transport("server did not agree to STARTTLS"));
        }
        self.set_capabilities(None);
        let stream = self.session.take_stream().await?;
        let stream = stream.upgrade_to_tls(&self.host).await?;
        self.session.resume(stream).await;
        debug!(host = %self.host, "SMTP session upgraded to TLS");
        self.send_ehlo().await
    }
}

impl<S> SmtpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Start a session on an already-connected stream: read the 220 greeting, then spawn the
    /// reader. EHLO is left to the caller.
    pub async fn from_stream(
        stream: S,
        host: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, CommandError> {
        let (session, greeting) =
            Session::<Smtp, S>::open(stream, config.connect_timeout, config.smtp_timeout).await?;
        Ok(Self {
            session,
            exclusive: AsyncMutex::new(()),
            host: host.into(),
            ehlo_domain: config.ehlo_hostname.clone(),
            greeting,
            capabilities: Mutex::new(None),
        })
    }

    pub fn greeting(&self) -> &SmtpReply {
        &self.greeting
    }

    /// Extensions from the most recent EHLO.
    pub fn capabilities(&self) -> Option<EhloCapabilities> {
        self.capabilities.lock().ok().and_then(|c| c.clone())
    }

    fn set_capabilities(&self, caps: Option<EhloCapabilities>) {
        if let Ok(mut slot) = self.capabilities.lock() {
            *slot = caps;
        }
    }

    /// Run any SMTP command.
    pub async fn execute<C>(&self, command: C) -> Result<C::Output, CommandError>
    where
        C: Command<Protocol = Smtp>,
    {
        let _exclusive = self.exclusive.lock().await;
        self.session.execute(command).await
    }

    pub async fn ehlo(&self) -> Result<EhloCapabilities, CommandError> {
        let _exclusive = self.exclusive.lock().await;
        self.send_ehlo().await
    }

    async fn send_ehlo(&self) -> Result<EhloCapabilities, CommandError> {
        let caps = self
            .session
            .execute(EhloCommand::new(self.ehlo_domain.clone()))
            .await?;
        debug!(extensions = ?caps.extensions, "EHLO");
        self.set_capabilities(Some(caps.clone()));
        Ok(caps)
    }

    /// AUTH with a single-shot SASL mechanism. Refused locally when EHLO did not list it.
    pub async fn authenticate(
        &self,
        mechanism: SaslMechanism,
        authcid: &str,
        secret: &str,
    ) -> Result<(), CommandError> {
        if let Some(caps) = self.capabilities() {
            if !caps.supports_auth(mechanism) {
                return Err(CommandError::invalid(format!(
                    "server does not support AUTH {}",
                    mechanism
                )));
            }
        }
        self.execute(AuthCommand::new(mechanism, authcid, secret))
            .await
    }

    /// One mail transaction: MAIL FROM, RCPT TO per recipient, DATA, then the content.
    /// After a rejected step the transaction is reset so the connection stays usable.
    pub async fn send_mail(
        &self,
        envelope: &Envelope,
        message: impl Into<Bytes>,
    ) -> Result<(), CommandError> {
        envelope.validate()?;
        let content = MessageContentCommand::new(message);
        content.validate()?;
        if let Some(limit) = self.capabilities().and_then(|c| c.size) {
            if content.message.len() as u64 > limit {
                return Err(CommandError::invalid(format!(
                    "message of {} bytes exceeds server limit of {} bytes",
                    content.message.len(),
                    limit
                )));
            }
        }

        let _exclusive = self.exclusive.lock().await;
        let result = self.transaction(envelope, content).await;
        if let Err(e @ CommandError::ProtocolFailure { .. }) = result.as_ref() {
            debug!(error = %e, "transaction rejected, resetting");
            if let Err(reset) = self.session.execute(RsetCommand).await {
                warn!(error = %reset, "RSET after rejected transaction failed");
            }
        }
        result
    }

    async fn transaction(
        &self,
        envelope: &Envelope,
        content: MessageContentCommand,
    ) -> Result<(), CommandError> {
        self.session
            .execute(MailFromCommand::new(envelope.sender.clone()))
            .await?;
        for recipient in &envelope.recipients {
            self.session
                .execute(RcptToCommand::new(recipient.clone()))
                .await?;
        }
        self.session.execute(DataCommand).await?;
        self.session.execute(content).await?;
        info!(
            recipients = envelope.recipients.len(),
            "message accepted for delivery"
        );
        Ok(())
    }

    pub async fn rset(&self) -> Result<(), CommandError> {
        self.execute(RsetCommand).await
    }

    pub async fn noop(&self) -> Result<(), CommandError> {
        self.execute(NoopCommand).await
    }

    /// QUIT, then close the connection whatever the server answered.
    pub async fn quit(&self) -> Result<(), CommandError> {
        let _exclusive = self.exclusive.lock().await;
        let result = self.session.execute(QuitCommand).await;
        self.session.close().await;
        result
    }
}
