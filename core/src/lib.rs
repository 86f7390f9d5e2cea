/*
 * lib.rs
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

//! Corriere core: typed IMAP and SMTP commands over one correlation engine.
//!
//! A command is validated, tagged (IMAP), paired with a handler installed on the connection,
//! written, and awaited under a deadline. Inbound events are parsed by a per-session reader
//! task and routed to the installed handler, which resolves the command's result exactly once.

pub mod command;
pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod sasl;
pub mod session;

pub use command::{Command, CommandHandler, Connection, EventSink, Protocol, Tag, WireRequest};
pub use config::ClientConfig;
pub use error::{CommandError, ConfigError};
pub use net::{MailStream, Security};
pub use protocol::imap::{Imap, ImapClient, MailboxStatus};
pub use protocol::smtp::{EhloCapabilities, Envelope, Smtp, SmtpClient};
pub use sasl::SaslMechanism;
pub use session::Session;
