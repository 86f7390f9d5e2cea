/*
 * error.rs
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

//! Error taxonomy for command execution and configuration loading.
//!
//! Every `execute` call ends in a success value or exactly one [`CommandError`].

use std::io;
use std::time::Duration;

/// Failure of one command. Surfaced to the caller of `execute`, never retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Local validation failed; nothing was written to the connection.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The peer answered with an explicit negative response (IMAP NO/BAD, SMTP 4xx/5xx).
    #[error("{}", protocol_failure_text(.code, .message))]
    ProtocolFailure { code: Option<u16>, message: String },
    /// No terminal response within the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The connection failed or closed while the command was in flight.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

fn protocol_failure_text(code: &Option<u16>, message: &str) -> String {
    match code {
        Some(c) => format!("server rejected command: {} {}", c, message),
        None => format!("server rejected command: {}", message),
    }
}

impl CommandError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportFailure(msg.into())
    }

    /// Negative IMAP response (no numeric code).
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ProtocolFailure {
            code: None,
            message: message.into(),
        }
    }

    /// Negative SMTP reply.
    pub fn reply(code: u16, message: impl Into<String>) -> Self {
        Self::ProtocolFailure {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout(_))
    }
}

impl From<io::Error> for CommandError {
    fn from(e: io::Error) -> Self {
        Self::TransportFailure(e.to_string())
    }
}

/// Failure loading [`crate::config::ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config XML: {0}")]
    Xml(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_is_transport_failure() {
        let e: CommandError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert_eq!(e, CommandError::TransportFailure("pipe closed".to_string()));
    }

    #[test]
    fn protocol_failure_display_includes_code() {
        let e = CommandError::reply(550, "mailbox unavailable");
        assert_eq!(e.to_string(), "server rejected command: 550 mailbox unavailable");
        let e = CommandError::rejected("[NONEXISTENT] no such mailbox");
        assert_eq!(e.to_string(), "server rejected command: [NONEXISTENT] no such mailbox");
    }
}
