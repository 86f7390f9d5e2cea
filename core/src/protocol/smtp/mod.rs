/*
 * mod.rs
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

//! SMTP submission client (RFC 5321, RFC 6409). Replies carry no tag; each reply belongs to the
//! single command in flight.

mod client;
pub mod commands;
pub mod dot_stuffer;
pub mod handlers;
pub mod response;

pub use client::SmtpClient;
pub use commands::*;
pub use dot_stuffer::{stuff_message, DotStuffer};
pub use handlers::ReplyHandler;
pub use response::{read_reply, SmtpReply};

use std::future::Future;
use std::io;

use tokio::io::AsyncRead;

use crate::command::Protocol;
use crate::error::CommandError;

/// Marker for the SMTP protocol.
#[derive(Debug, Clone, Copy)]
pub struct Smtp;

impl Protocol for Smtp {
    type Event = SmtpReply;

    const NAME: &'static str = "smtp";
    const TAGGED: bool = false;

    fn read_event<'a, R>(
        reader: &'a mut R,
        buf: &'a mut Vec<u8>,
    ) -> impl Future<Output = io::Result<SmtpReply>> + Send + 'a
    where
        R: AsyncRead + Unpin + Send + 'a,
    {
        read_reply(reader, buf)
    }

    /// The service is ready only with 220; 554 (or anything else) refuses the session.
    fn check_greeting(reply: &SmtpReply) -> Result<(), CommandError> {
        if reply.code == 220 {
            Ok(())
        } else {
            Err(CommandError::reply(reply.code, reply.message()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_must_be_220() {
        assert!(Smtp::check_greeting(&SmtpReply::new(220, "mx ESMTP")).is_ok());
        assert_eq!(
            Smtp::check_greeting(&SmtpReply::new(554, "no service")),
            Err(CommandError::reply(554, "no service"))
        );
    }
}
