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

//! IMAP4rev2 (RFC 9051) client: tagged commands correlated by tag, untagged data accumulated
//! per command.

mod client;
pub mod commands;
pub mod handlers;
pub mod mailbox;
pub mod response;

pub use client::ImapClient;
pub use commands::*;
pub use handlers::{Accumulate, TaggedHandler};
pub use mailbox::MailboxStatus;
pub use response::{
    parse_response, read_response_line, ImapResponse, ImapStatus, ListEntry, ResponseCode,
    StatusResponse, Untagged,
};

use std::future::Future;
use std::io;

use tokio::io::AsyncRead;

use crate::command::Protocol;
use crate::error::CommandError;

async fn next_response<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<ImapResponse>
where
    R: AsyncRead + Unpin,
{
    let (line, literals) = read_response_line(reader, buf).await?;
    Ok(parse_response(&line, literals))
}

/// Marker for the IMAP protocol.
#[derive(Debug, Clone, Copy)]
pub struct Imap;

impl Protocol for Imap {
    type Event = ImapResponse;

    const NAME: &'static str = "imap";
    const TAGGED: bool = true;

    fn read_event<'a, R>(
        reader: &'a mut R,
        buf: &'a mut Vec<u8>,
    ) -> impl Future<Output = io::Result<ImapResponse>> + Send + 'a
    where
        R: AsyncRead + Unpin + Send + 'a,
    {
        next_response(reader, buf)
    }

    /// `* OK` or `* PREAUTH`; `* BYE` (or anything else) refuses the session.
    fn check_greeting(event: &ImapResponse) -> Result<(), CommandError> {
        match event {
            ImapResponse::Untagged(Untagged::Status(s))
                if matches!(s.status, ImapStatus::Ok | ImapStatus::PreAuth) =>
            {
                Ok(())
            }
            ImapResponse::Untagged(Untagged::Status(s)) => Err(CommandError::rejected(format!(
                "{} {}",
                s.status.as_str(),
                s.message()
            ))),
            other => Err(CommandError::transport(format!(
                "unexpected IMAP greeting: {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_events_from_stream() {
        let mut input: &[u8] = b"* OK [CAPABILITY IMAP4rev2] ready\r\nA0001 OK done\r\n";
        let mut buf = Vec::new();
        let greeting = Imap::read_event(&mut input, &mut buf).await.unwrap();
        assert!(Imap::check_greeting(&greeting).is_ok());
        let done = Imap::read_event(&mut input, &mut buf).await.unwrap();
        assert!(matches!(done, ImapResponse::Tagged { ref tag, .. } if tag == "A0001"));
        assert!(Imap::read_event(&mut input, &mut buf).await.is_err());
    }

    #[test]
    fn bye_greeting_is_refused() {
        let bye = parse_response("* BYE too many connections", Vec::new());
        assert!(matches!(
            Imap::check_greeting(&bye),
            Err(CommandError::ProtocolFailure { code: None, .. })
        ));
        let preauth = parse_response("* PREAUTH welcome back", Vec::new());
        assert!(Imap::check_greeting(&preauth).is_ok());
    }
}
