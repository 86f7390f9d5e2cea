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

//! Generic command/response correlation engine shared by IMAP and SMTP.
//!
//! A [`Command`] is validated, given a tag when its protocol uses tags, paired with a fresh
//! [`CommandHandler`](handler::CommandHandler) that is installed in the connection's
//! [`Pipeline`](pipeline::Pipeline), and only then encoded and written. The caller awaits the
//! handler's promise under a deadline; the handler is removed on every exit path.

pub mod dispatcher;
pub mod handler;
pub mod pipeline;
pub mod promise;
pub mod tag;

pub use dispatcher::{Connection, EventSink};
pub use handler::CommandHandler;
pub use pipeline::{Delivery, HandlerId, Pipeline};
pub use promise::{promise, Promise, ResultFuture};
pub use tag::{Tag, TagAllocator};

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::CommandError;

/// Framing and correlation properties of one mail protocol.
pub trait Protocol: Send + Sync + 'static {
    /// One parsed inbound unit.
    type Event: fmt::Debug + Send + 'static;

    /// Short name for logs ("imap", "smtp").
    const NAME: &'static str;

    /// Whether requests carry a client tag. Untagged protocols rely on strict
    /// request/response ordering with one command in flight.
    const TAGGED: bool;

    /// Read one framed event from the stream. Errors (including EOF) end the connection.
    fn read_event<'a, R>(
        reader: &'a mut R,
        buf: &'a mut Vec<u8>,
    ) -> impl Future<Output = io::Result<Self::Event>> + Send + 'a
    where
        R: AsyncRead + Unpin + Send + 'a;

    /// Accept or reject the server greeting, read before any command is issued.
    fn check_greeting(event: &Self::Event) -> Result<(), CommandError>;
}

/// Exact bytes of one request. Requests carrying credentials print redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct WireRequest {
    bytes: Bytes,
    sensitive: bool,
}

impl WireRequest {
    /// A command line; CRLF is appended.
    pub fn line(line: impl Into<String>) -> Self {
        let mut s = line.into();
        s.push_str("\r\n");
        Self {
            bytes: Bytes::from(s),
            sensitive: false,
        }
    }

    /// Bytes sent as-is (e.g. a dot-stuffed message body).
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            sensitive: false,
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            return write!(f, "<{} bytes redacted>", self.bytes.len());
        }
        const PREVIEW: usize = 120;
        let shown = &self.bytes[..self.bytes.len().min(PREVIEW)];
        let text = String::from_utf8_lossy(shown);
        let text = text.trim_end_matches(['\r', '\n']);
        if self.bytes.len() > PREVIEW {
            write!(f, "{:?}... ({} bytes)", text, self.bytes.len())
        } else {
            write!(f, "{:?}", text)
        }
    }
}

/// A typed, immutable description of one protocol operation.
///
/// Validated once, encoded once, then discarded. Every command names the handler that decodes
/// its responses; there is no fallback handler.
pub trait Command: Send {
    type Protocol: Protocol;
    type Output: Send + 'static;
    type Handler: CommandHandler<Event = <Self::Protocol as Protocol>::Event, Output = Self::Output>;

    /// Name for logs (the protocol verb).
    fn name(&self) -> &'static str;

    /// Local validation. Runs before any byte is written or any handler installed.
    fn validate(&self) -> Result<(), CommandError> {
        Ok(())
    }

    /// Wire form. For tagged protocols `tag` is the tag the handler will correlate on.
    fn encode(&self, tag: Option<&Tag>) -> WireRequest;

    /// Fresh handler that will resolve `promise`.
    fn handler(&self, tag: Option<Tag>, promise: Promise<Self::Output>) -> Self::Handler;

    /// Per-command deadline; `None` uses the connection default.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}
