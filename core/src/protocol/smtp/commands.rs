/*
 * commands.rs
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

//! Typed SMTP commands. One command is in flight at a time; the reply's code class completes it.

use std::time::Duration;

use bytes::Bytes;

use super::dot_stuffer::stuff_message;
use super::handlers::ReplyHandler;
use super::response::SmtpReply;
use super::Smtp;
use crate::command::{Command, Promise, Tag, WireRequest};
use crate::error::CommandError;
use crate::sasl::{initial_response_base64, SaslMechanism};

/// RFC 5321 4.5.3.2.6: wait up to 10 minutes for the reply to the end-of-data marker.
const DATA_TERMINATION_TIMEOUT: Duration = Duration::from_secs(600);

fn check_line(what: &str, value: &str) -> Result<(), CommandError> {
    if value.contains(['\r', '\n', '\0']) {
        return Err(CommandError::invalid(format!("{} cannot contain CR, LF or NUL", what)));
    }
    Ok(())
}

fn check_path(what: &str, address: &str) -> Result<(), CommandError> {
    check_line(what, address)?;
    if address.contains(['<', '>']) || address.chars().any(char::is_whitespace) {
        return Err(CommandError::invalid(format!("{} is not a valid mailbox: {}", what, address)));
    }
    Ok(())
}

/// Extensions advertised in the EHLO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EhloCapabilities {
    /// First line of the reply (server domain and greeting).
    pub greeting: String,
    /// Extension keywords, upper-cased, without parameters.
    pub extensions: Vec<String>,
    /// SASL mechanisms from the AUTH extension, upper-cased.
    pub auth_mechanisms: Vec<String>,
    pub starttls: bool,
    pub chunking: bool,
    /// Maximum message size from SIZE, if the server declared one.
    pub size: Option<u64>,
}

impl EhloCapabilities {
    pub fn from_reply(reply: &SmtpReply) -> Self {
        let mut caps = EhloCapabilities {
            greeting: reply.lines.first().cloned().unwrap_or_default(),
            ..Default::default()
        };
        for line in reply.lines.iter().skip(1) {
            let mut words = line.split_whitespace();
            let Some(keyword) = words.next() else {
                continue;
            };
            let keyword = keyword.to_ascii_uppercase();
            match keyword.as_str() {
                "STARTTLS" => caps.starttls = true,
                "CHUNKING" => caps.chunking = true,
                "AUTH" => caps
                    .auth_mechanisms
                    .extend(words.map(|w| w.to_ascii_uppercase())),
                "SIZE" => caps.size = words.next().and_then(|s| s.parse().ok()).filter(|&n| n > 0),
                _ => {}
            }
            caps.extensions.push(keyword);
        }
        caps
    }

    pub fn supports(&self, keyword: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(keyword))
    }

    pub fn supports_auth(&self, mechanism: SaslMechanism) -> bool {
        self.auth_mechanisms.iter().any(|m| m == mechanism.name())
    }
}

/// Reverse-path and forward-paths of one mail transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse-path; empty for the null sender (bounces).
    pub sender: String,
    pub recipients: Vec<String>,
}

impl Envelope {
    pub fn new(sender: impl Into<String>, recipients: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            sender: sender.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if self.recipients.is_empty() {
            return Err(CommandError::invalid("Envelope has no recipients"));
        }
        MailFromCommand::new(self.sender.clone()).validate()?;
        for r in &self.recipients {
            RcptToCommand::new(r.clone()).validate()?;
        }
        Ok(())
    }
}

/// Commands whose result is only the positive reply.
macro_rules! simple_command {
    ($(#[$doc:meta])* $name:ident, $verb:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Command for $name {
            type Protocol = Smtp;
            type Output = ();
            type Handler = ReplyHandler<()>;

            fn name(&self) -> &'static str {
                $verb
            }

            fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
                WireRequest::line($verb)
            }

            fn handler(&self, _tag: Option<Tag>, promise: Promise<()>) -> ReplyHandler<()> {
                ReplyHandler::completion(promise, None)
            }
        }
    };
}

simple_command!(
    /// RSET: abort the current mail transaction.
    RsetCommand,
    "RSET"
);
simple_command!(NoopCommand, "NOOP");
simple_command!(
    /// QUIT. The server answers 221 and closes the connection.
    QuitCommand,
    "QUIT"
);

/// EHLO with the client's domain.
#[derive(Debug, Clone)]
pub struct EhloCommand {
    pub domain: String,
}

impl EhloCommand {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl Command for EhloCommand {
    type Protocol = Smtp;
    type Output = EhloCapabilities;
    type Handler = ReplyHandler<EhloCapabilities>;

    fn name(&self) -> &'static str {
        "EHLO"
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.domain.is_empty() {
            return Err(CommandError::invalid("EHLO domain cannot be empty"));
        }
        check_line("EHLO domain", &self.domain)
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        WireRequest::line(format!("EHLO {}", self.domain))
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<EhloCapabilities>) -> Self::Handler {
        ReplyHandler::new(promise, None, EhloCapabilities::from_reply)
    }
}

/// STARTTLS. `true` once the server agreed with 220; the caller must then upgrade the stream.
/// Other positive replies are not terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartTlsCommand;

impl Command for StartTlsCommand {
    type Protocol = Smtp;
    type Output = bool;
    type Handler = ReplyHandler<bool>;

    fn name(&self) -> &'static str {
        "STARTTLS"
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        WireRequest::line("STARTTLS")
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<bool>) -> Self::Handler {
        ReplyHandler::only(promise, 220, |_| true)
    }
}

/// AUTH with a SASL initial response (RFC 4954); 235 completes it.
#[derive(Clone)]
pub struct AuthCommand {
    pub mechanism: SaslMechanism,
    pub authcid: String,
    pub secret: String,
}

impl std::fmt::Debug for AuthCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCommand")
            .field("mechanism", &self.mechanism)
            .field("authcid", &self.authcid)
            .finish_non_exhaustive()
    }
}

impl AuthCommand {
    pub fn new(mechanism: SaslMechanism, authcid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            mechanism,
            authcid: authcid.into(),
            secret: secret.into(),
        }
    }
}

impl Command for AuthCommand {
    type Protocol = Smtp;
    type Output = ();
    type Handler = ReplyHandler<()>;

    fn name(&self) -> &'static str {
        "AUTH"
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.authcid.is_empty() {
            return Err(CommandError::invalid("Authentication identity cannot be empty"));
        }
        Ok(())
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        let ir = initial_response_base64(self.mechanism, &self.authcid, &self.secret);
        WireRequest::line(format!("AUTH {} {}", self.mechanism.name(), ir)).sensitive()
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<()>) -> Self::Handler {
        ReplyHandler::completion(promise, None)
    }
}

/// MAIL FROM:<reverse-path>.
#[derive(Debug, Clone)]
pub struct MailFromCommand {
    pub sender: String,
}

impl MailFromCommand {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Command for MailFromCommand {
    type Protocol = Smtp;
    type Output = ();
    type Handler = ReplyHandler<()>;

    fn name(&self) -> &'static str {
        "MAIL"
    }

    fn validate(&self) -> Result<(), CommandError> {
        check_path("Sender", &self.sender)
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        WireRequest::line(format!("MAIL FROM:<{}>", self.sender))
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<()>) -> Self::Handler {
        ReplyHandler::completion(promise, None)
    }
}

/// RCPT TO:<forward-path>. 250, 251 and 252 all accept the recipient.
#[derive(Debug, Clone)]
pub struct RcptToCommand {
    pub recipient: String,
}

impl RcptToCommand {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

impl Command for RcptToCommand {
    type Protocol = Smtp;
    type Output = ();
    type Handler = ReplyHandler<()>;

    fn name(&self) -> &'static str {
        "RCPT"
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.recipient.is_empty() {
            return Err(CommandError::invalid("Recipient cannot be empty"));
        }
        check_path("Recipient", &self.recipient)
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        WireRequest::line(format!("RCPT TO:<{}>", self.recipient))
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<()>) -> Self::Handler {
        ReplyHandler::completion(promise, None)
    }
}

/// DATA. The server's 354 go-ahead completes it; the content is sent as a separate command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataCommand;

impl Command for DataCommand {
    type Protocol = Smtp;
    type Output = ();
    type Handler = ReplyHandler<()>;

    fn name(&self) -> &'static str {
        "DATA"
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        WireRequest::line("DATA")
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<()>) -> Self::Handler {
        ReplyHandler::completion(promise, Some(354))
    }
}

/// Message content after DATA: dot-stuffed and terminated by `CRLF.CRLF`.
#[derive(Debug, Clone)]
pub struct MessageContentCommand {
    pub message: Bytes,
}

impl MessageContentCommand {
    pub fn new(message: impl Into<Bytes>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Command for MessageContentCommand {
    type Protocol = Smtp;
    type Output = ();
    type Handler = ReplyHandler<()>;

    fn name(&self) -> &'static str {
        "message content"
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.message.is_empty() {
            return Err(CommandError::invalid("Message content cannot be empty"));
        }
        Ok(())
    }

    fn encode(&self, _tag: Option<&Tag>) -> WireRequest {
        WireRequest::raw(stuff_message(&self.message))
    }

    fn handler(&self, _tag: Option<Tag>, promise: Promise<()>) -> Self::Handler {
        ReplyHandler::completion(promise, None)
    }

    fn timeout(&self) -> Option<Duration> {
        Some(DATA_TERMINATION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire<C: Command>(c: &C) -> Vec<u8> {
        c.encode(None).as_bytes().to_vec()
    }

    #[test]
    fn envelope_commands_encode_angle_brackets() {
        assert_eq!(wire(&MailFromCommand::new("alice@example.org")), b"MAIL FROM:<alice@example.org>\r\n");
        assert_eq!(wire(&MailFromCommand::new("")), b"MAIL FROM:<>\r\n");
        assert_eq!(wire(&RcptToCommand::new("bob@example.net")), b"RCPT TO:<bob@example.net>\r\n");
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(matches!(RcptToCommand::new("").validate(), Err(CommandError::InvalidArgument(_))));
        assert!(RcptToCommand::new("a@b>\r\nRSET").validate().is_err());
        assert!(MailFromCommand::new("").validate().is_ok());
        assert!(EhloCommand::new("").validate().is_err());
        assert!(MessageContentCommand::new(Bytes::new()).validate().is_err());
        assert!(Envelope::new("a@b", Vec::<String>::new()).validate().is_err());
        assert!(Envelope::new("a@b", ["c@d"]).validate().is_ok());
    }

    #[test]
    fn content_is_stuffed_and_terminated() {
        let c = MessageContentCommand::new(&b"Subject: x\r\n\r\n.\r\n"[..]);
        assert_eq!(wire(&c), b"Subject: x\r\n\r\n..\r\n.\r\n");
        assert_eq!(c.timeout(), Some(DATA_TERMINATION_TIMEOUT));
    }

    #[test]
    fn auth_is_sensitive() {
        let c = AuthCommand::new(SaslMechanism::Plain, "tim", "tanstaaftanstaaf");
        let request = c.encode(None);
        assert!(request.is_sensitive());
        assert_eq!(request.as_bytes(), b"AUTH PLAIN AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n");
    }

    #[test]
    fn ehlo_capabilities() {
        let reply = SmtpReply {
            code: 250,
            lines: vec![
                "mail.example.com Hello".to_string(),
                "PIPELINING".to_string(),
                "SIZE 35882577".to_string(),
                "auth PLAIN xoauth2".to_string(),
                "STARTTLS".to_string(),
                "CHUNKING".to_string(),
            ],
        };
        let caps = EhloCapabilities::from_reply(&reply);
        assert_eq!(caps.greeting, "mail.example.com Hello");
        assert!(caps.starttls && caps.chunking);
        assert_eq!(caps.size, Some(35882577));
        assert!(caps.supports("pipelining"));
        assert!(caps.supports_auth(SaslMechanism::Plain));
        assert!(caps.supports_auth(SaslMechanism::XOAuth2));
    }

    #[tokio::test]
    async fn starttls_completes_only_on_220() {
        use crate::command::{promise, CommandHandler};

        let (p, f) = promise();
        let mut h = StartTlsCommand.handler(None, p);
        assert!(!h.on_event(&SmtpReply::new(250, "Ok")));
        assert!(h.on_event(&SmtpReply::new(220, "Ready to start TLS")));
        assert_eq!(f.await, Ok(true));

        let (p, f) = promise();
        let mut h = StartTlsCommand.handler(None, p);
        assert!(h.on_event(&SmtpReply::new(454, "TLS not available due to temporary reason")));
        assert_eq!(
            f.await,
            Err(CommandError::reply(454, "TLS not available due to temporary reason"))
        );
    }
}
