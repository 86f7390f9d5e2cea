/*
 * handler.rs
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

//! Command handler: the short-lived state machine that consumes inbound events for one
//! in-flight command and resolves its [`Promise`].
//!
//! Lifecycle: installed on construction, terminal once `on_event` returns true or
//! `on_transport_error` is called. A handler is the only writer of its promise apart from the
//! dispatcher's timeout path; the promise's single assignment arbitrates between them.

use crate::command::promise::Promise;
use crate::error::CommandError;

pub trait CommandHandler: Send + 'static {
    /// Inbound event type of the protocol (parsed IMAP response, SMTP reply).
    type Event;
    /// Success value delivered to the caller.
    type Output: Send + 'static;

    /// Inspect one event, update accumulated state, and return true once the command has a
    /// terminal outcome (promise resolved with success or a protocol failure).
    fn on_event(&mut self, event: &Self::Event) -> bool;

    /// The promise this handler resolves.
    fn promise(&self) -> &Promise<Self::Output>;

    /// The connection failed while installed. Always terminal.
    fn on_transport_error(&mut self, error: &CommandError) {
        self.promise().fail(error.clone());
    }
}

/// Object-safe view of a handler with its output type erased, as stored in the pipeline.
pub(crate) trait InstalledHandler<E>: Send {
    fn on_event(&mut self, event: &E) -> bool;
    fn on_transport_error(&mut self, error: &CommandError);
}

impl<H> InstalledHandler<H::Event> for H
where
    H: CommandHandler,
{
    fn on_event(&mut self, event: &H::Event) -> bool {
        CommandHandler::on_event(self, event)
    }

    fn on_transport_error(&mut self, error: &CommandError) {
        CommandHandler::on_transport_error(self, error)
    }
}
