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

//! IMAP client facade: connect, optional STARTTLS, and typed wrappers over the commands.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use super::commands::*;
use super::mailbox::MailboxStatus;
use super::response::{ImapResponse, ListEntry, StatusResponse, Untagged};
use super::Imap;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::error::CommandError;
use crate::net::{MailStream, Security};
use crate::sasl::SaslMechanism;
use crate::session::Session;

/// One IMAP connection. Commands issued concurrently through `&self` run one at a time, in
/// the order they acquire the connection. A STARTTLS upgrade excludes every other command
/// until the stream has been swapped.
pub struct ImapClient<S = MailStream> {
    session: Session<Imap, S>,
    exclusive: AsyncMutex<()>,
    host: String,
    greeting: StatusResponse,
}

impl ImapClient<MailStream> {
    /// Connect to `host:port`. With [`Security::StartTls`] the session is upgraded before
    /// returning.
    pub async fn connect(
        host: &str,
        port: u16,
        security: Security,
        config: &ClientConfig,
    ) -> Result<Self, CommandError> {
        info!(host, port, ?security, "connecting to IMAP server");
        let stream = MailStream::connect(host, port, security, config.connect_timeout).await?;
        let client = Self::from_stream(stream, host, config).await?;
        if security == Security::StartTls {
            client.starttls().await?;
        }
        Ok(client)
    }

    /// Issue STARTTLS and upgrade the stream on OK. Capabilities learned before the upgrade
    /// are stale afterwards.
    pub async fn starttls(&self) -> Result<(), CommandError> {
        let _exclusive = self.exclusive.lock().await;
        self.session.execute(StartTlsCommand).await?;
        let stream = self.session.take_stream().await?;
        let stream = stream.upgrade_to_tls(&self.host).await?;
        self.session.resume(stream).await;
        debug!(host = %self.host, "IMAP session upgraded to TLS");
        Ok(())
    }
}

impl<S> ImapClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Start a session on an already-connected stream: read the greeting, then spawn the reader.
    pub async fn from_stream(
        stream: S,
        host: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, CommandError> {
        let (session, greeting) =
            Session::<Imap, S>::open(stream, config.connect_timeout, config.imap_timeout).await?;
        let greeting = match greeting {
            ImapResponse::Untagged(Untagged::Status(s)) => s,
            other => {
                return Err(CommandError::transport(format!(
                    "unexpected IMAP greeting: {:?}",
                    other
                )))
            }
        };
        Ok(Self {
            session,
            exclusive: AsyncMutex::new(()),
            host: host.into(),
            greeting,
        })
    }

    /// The server greeting (OK or PREAUTH).
    pub fn greeting(&self) -> &StatusResponse {
        &self.greeting
    }

    pub fn default_timeout(&self) -> Duration {
        self.session.connection().default_timeout()
    }

    /// Run any IMAP command.
    pub async fn execute<C>(&self, command: C) -> Result<C::Output, CommandError>
    where
        C: Command<Protocol = Imap>,
    {
        let _exclusive = self.exclusive.lock().await;
        self.session.execute(command).await
    }

    pub async fn capability(&self) -> Result<Vec<String>, CommandError> {
        self.execute(CapabilityCommand).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), CommandError> {
        self.execute(LoginCommand::new(username, password)).await
    }

    pub async fn authenticate(
        &self,
        mechanism: SaslMechanism,
        authcid: &str,
        secret: &str,
    ) -> Result<(), CommandError> {
        self.execute(AuthenticateCommand::new(mechanism, authcid, secret))
            .await
    }

    pub async fn select(&self, mailbox: &str) -> Result<MailboxStatus, CommandError> {
        self.execute(SelectMailboxCommand::new(mailbox)).await
    }

    pub async fn examine(&self, mailbox: &str) -> Result<MailboxStatus, CommandError> {
        self.execute(ExamineMailboxCommand::new(mailbox)).await
    }

    pub async fn create(&self, mailbox: &str) -> Result<(), CommandError> {
        self.execute(CreateCommand::new(mailbox)).await
    }

    pub async fn delete(&self, mailbox: &str) -> Result<(), CommandError> {
        self.execute(DeleteCommand::new(mailbox)).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<(), CommandError> {
        self.execute(RenameCommand::new(from, to)).await
    }

    pub async fn list(&self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>, CommandError> {
        self.execute(ListCommand {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        })
        .await
    }

    pub async fn noop(&self) -> Result<(), CommandError> {
        self.execute(NoopCommand).await
    }

    pub async fn close(&self) -> Result<(), CommandError> {
        self.execute(CloseCommand).await
    }

    pub async fn unselect(&self) -> Result<(), CommandError> {
        self.execute(UnselectCommand).await
    }

    /// LOGOUT, then close the connection whatever the server answered.
    pub async fn logout(&self) -> Result<(), CommandError> {
        let _exclusive = self.exclusive.lock().await;
        let result = self.session.execute(LogoutCommand).await;
        self.session.close().await;
        result
    }
}
