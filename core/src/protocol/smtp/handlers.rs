/*
 * handlers.rs
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

//! SMTP reply handler. SMTP has no tags: with one command in flight, the next complete reply
//! belongs to it, and its code class decides the outcome.

use tracing::trace;

use super::response::SmtpReply;
use crate::command::{CommandHandler, Promise};
use crate::error::CommandError;

/// Handler shared by every SMTP command.
///
/// A 2xx reply, or the command's declared intermediate 3xx code, succeeds and is mapped into
/// the command's result. A handler built with [`ReplyHandler::only`] succeeds on exactly one
/// code instead. 4xx and 5xx fail with the reply code and text. Anything else is not terminal.
pub struct ReplyHandler<T: Send + 'static> {
    promise: Promise<T>,
    intermediate: Option<u16>,
    exact: Option<u16>,
    map: fn(&SmtpReply) -> T,
}

impl<T: Send + 'static> ReplyHandler<T> {
    pub fn new(promise: Promise<T>, intermediate: Option<u16>, map: fn(&SmtpReply) -> T) -> Self {
        Self {
            promise,
            intermediate,
            exact: None,
            map,
        }
    }

    /// Succeed only on `code`; other positive replies are not terminal.
    pub fn only(promise: Promise<T>, code: u16, map: fn(&SmtpReply) -> T) -> Self {
        Self {
            promise,
            intermediate: None,
            exact: Some(code),
            map,
        }
    }

    fn accepts(&self, reply: &SmtpReply) -> bool {
        match self.exact {
            Some(code) => reply.code == code,
            None => reply.is_positive() || self.intermediate == Some(reply.code),
        }
    }
}

impl ReplyHandler<()> {
    /// Handler whose result is just the positive reply.
    pub fn completion(promise: Promise<()>, intermediate: Option<u16>) -> Self {
        Self::new(promise, intermediate, |_| ())
    }
}

impl<T: Send + 'static> CommandHandler for ReplyHandler<T> {
    type Event = SmtpReply;
    type Output = T;

    fn on_event(&mut self, reply: &SmtpReply) -> bool {
        if reply.is_negative() {
            self.promise
                .fail(CommandError::reply(reply.code, reply.message()));
            return true;
        }
        if self.accepts(reply) {
            self.promise.succeed((self.map)(reply));
            return true;
        }
        trace!(code = reply.code, "non-terminal reply");
        false
    }

    fn promise(&self) -> &Promise<T> {
        &self.promise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::promise;

    #[tokio::test]
    async fn positive_reply_completes() {
        let (p, f) = promise();
        let mut h = ReplyHandler::completion(p, None);
        assert!(h.on_event(&SmtpReply::new(250, "Ok")));
        assert_eq!(f.await, Ok(()));
    }

    #[tokio::test]
    async fn negative_reply_carries_code_and_text() {
        let (p, f) = promise();
        let mut h = ReplyHandler::completion(p, None);
        assert!(h.on_event(&SmtpReply::new(550, "5.1.1 No such user")));
        assert_eq!(f.await, Err(CommandError::reply(550, "5.1.1 No such user")));
    }

    #[tokio::test]
    async fn declared_intermediate_is_success() {
        let (p, f) = promise();
        let mut h = ReplyHandler::completion(p, Some(354));
        assert!(h.on_event(&SmtpReply::new(354, "End data with <CR><LF>.<CR><LF>")));
        assert_eq!(f.await, Ok(()));
    }

    #[tokio::test]
    async fn undeclared_intermediate_is_not_terminal() {
        let (p, f) = promise::<u16>();
        let mut h = ReplyHandler::new(p, None, |r| r.code);
        assert!(!h.on_event(&SmtpReply::new(334, "")));
        assert!(!h.promise().is_resolved());
        assert!(h.on_event(&SmtpReply::new(235, "Authentication successful")));
        assert_eq!(f.await, Ok(235));
    }

    #[tokio::test]
    async fn exact_code_ignores_other_positive_replies() {
        let (p, f) = promise();
        let mut h = ReplyHandler::only(p, 220, |_| true);
        assert!(!h.on_event(&SmtpReply::new(250, "Ok")));
        assert!(!h.promise().is_resolved());
        assert!(h.on_event(&SmtpReply::new(220, "2.0.0 Ready to start TLS")));
        assert_eq!(f.await, Ok(true));
    }
}
