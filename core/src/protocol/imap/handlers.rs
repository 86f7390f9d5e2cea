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

//! IMAP command handler: completion keys off the tagged response carrying this handler's tag;
//! untagged data in between is folded into a per-command accumulator.

use tracing::trace;

use super::mailbox::MailboxStatus;
use super::response::{ImapResponse, ImapStatus, ListEntry, ResponseCode, StatusResponse, Untagged};
use crate::command::{CommandHandler, Promise, Tag};
use crate::error::CommandError;

/// Folds the untagged responses of one command into its result.
pub trait Accumulate: Default + Send + 'static {
    type Output: Send + 'static;

    fn untagged(&mut self, data: &Untagged);

    /// Response code on the final tagged OK.
    fn tagged_code(&mut self, _code: &ResponseCode) {}

    fn finish(self) -> Self::Output;
}

/// Handler shared by every IMAP command; `A` decides what the command produces.
pub struct TaggedHandler<A: Accumulate> {
    tag: Option<Tag>,
    promise: Promise<A::Output>,
    state: Option<A>,
}

impl<A: Accumulate> TaggedHandler<A> {
    pub fn new(tag: Option<Tag>, promise: Promise<A::Output>) -> Self {
        Self {
            tag,
            promise,
            state: Some(A::default()),
        }
    }

    fn owns(&self, tag: &Tag) -> bool {
        match &self.tag {
            Some(own) => own == tag,
            None => true,
        }
    }

    fn complete(&mut self, response: &StatusResponse) {
        match response.status {
            ImapStatus::Ok => {
                let mut state = self.state.take().unwrap_or_default();
                if let Some(code) = &response.code {
                    state.tagged_code(code);
                }
                self.promise.succeed(state.finish());
            }
            status => {
                self.promise.fail(CommandError::rejected(format!(
                    "{} {}",
                    status.as_str(),
                    response.message()
                )));
            }
        }
    }
}

impl<A: Accumulate> CommandHandler for TaggedHandler<A> {
    type Event = ImapResponse;
    type Output = A::Output;

    fn on_event(&mut self, event: &ImapResponse) -> bool {
        match event {
            ImapResponse::Untagged(data) => {
                if let Some(state) = self.state.as_mut() {
                    state.untagged(data);
                }
                false
            }
            ImapResponse::Continuation(text) => {
                trace!(%text, "unexpected continuation request");
                false
            }
            ImapResponse::Tagged { tag, response } => {
                if !self.owns(tag) {
                    trace!(%tag, "tagged response for another command");
                    return false;
                }
                self.complete(response);
                true
            }
        }
    }

    fn promise(&self) -> &Promise<A::Output> {
        &self.promise
    }
}

/// Commands whose only result is the tagged OK.
#[derive(Debug, Default)]
pub struct Completion;

impl Accumulate for Completion {
    type Output = ();

    fn untagged(&mut self, _data: &Untagged) {}

    fn finish(self) {}
}

impl Accumulate for MailboxStatus {
    type Output = MailboxStatus;

    fn untagged(&mut self, data: &Untagged) {
        match data {
            Untagged::Exists(n) => self.exists = *n,
            Untagged::Recent(n) => self.recent = *n,
            Untagged::Flags(flags) => self.flags = flags.clone(),
            Untagged::Status(StatusResponse {
                code: Some(code), ..
            }) => match code {
                ResponseCode::PermanentFlags(flags) => self.permanent_flags = flags.clone(),
                ResponseCode::UidValidity(n) => self.uid_validity = Some(*n),
                ResponseCode::UidNext(n) => self.uid_next = Some(*n),
                ResponseCode::Unseen(n) => self.first_unseen = Some(*n),
                _ => {}
            },
            _ => {}
        }
    }

    fn tagged_code(&mut self, code: &ResponseCode) {
        match code {
            ResponseCode::ReadOnly => self.read_only = true,
            ResponseCode::ReadWrite => self.read_only = false,
            _ => {}
        }
    }

    fn finish(self) -> MailboxStatus {
        self
    }
}

/// CAPABILITY data, from `* CAPABILITY` or a `[CAPABILITY ...]` code on the tagged OK.
#[derive(Debug, Default)]
pub struct Capabilities(Vec<String>);

impl Accumulate for Capabilities {
    type Output = Vec<String>;

    fn untagged(&mut self, data: &Untagged) {
        match data {
            Untagged::Capability(caps) => self.0 = caps.clone(),
            Untagged::Status(StatusResponse {
                code: Some(ResponseCode::Capability(caps)),
                ..
            }) => self.0 = caps.clone(),
            _ => {}
        }
    }

    fn tagged_code(&mut self, code: &ResponseCode) {
        if let ResponseCode::Capability(caps) = code {
            self.0 = caps.clone();
        }
    }

    fn finish(self) -> Vec<String> {
        self.0
    }
}

/// `* LIST` entries in arrival order.
#[derive(Debug, Default)]
pub struct MailboxList(Vec<ListEntry>);

impl Accumulate for MailboxList {
    type Output = Vec<ListEntry>;

    fn untagged(&mut self, data: &Untagged) {
        if let Untagged::List(entry) = data {
            self.0.push(entry.clone());
        }
    }

    fn finish(self) -> Vec<ListEntry> {
        self.0
    }
}

pub type CompletionHandler = TaggedHandler<Completion>;
pub type SelectHandler = TaggedHandler<MailboxStatus>;
pub type CapabilityHandler = TaggedHandler<Capabilities>;
pub type ListHandler = TaggedHandler<MailboxList>;
