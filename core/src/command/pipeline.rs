/*
 * pipeline.rs
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

//! Handler pipeline: the ordered set of handlers installed on one connection.
//!
//! Inbound events go to the oldest installed handler. Membership changes and delivery share one
//! lock, so a handler never sees an event after removal and never misses one that arrived before
//! removal was requested. A handler that reports completion is detached by the pipeline once its
//! callback has returned; the dispatcher's later `remove` is then a no-op.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::command::handler::{CommandHandler, InstalledHandler};
use crate::error::CommandError;

/// Identity of an installed handler, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to a handler, which is still waiting for more.
    Pending(HandlerId),
    /// Handed to a handler, which completed and was detached.
    Completed(HandlerId),
    /// No handler installed; the event is dropped.
    Unclaimed,
}

struct Entry<E> {
    id: HandlerId,
    handler: Box<dyn InstalledHandler<E>>,
}

struct State<E> {
    handlers: VecDeque<Entry<E>>,
    next_id: u64,
    /// Set once the transport has failed; later installs are refused with this error.
    closed: Option<CommandError>,
}

pub struct Pipeline<E> {
    state: Mutex<State<E>>,
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                handlers: VecDeque::new(),
                next_id: 1,
                closed: None,
            }),
        }
    }
}

impl<E> Pipeline<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State<E>> {
        // A panicking handler must not wedge the connection for every later command.
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a handler. Fails with the recorded transport error once the pipeline is closed.
    pub fn install<H>(&self, handler: H) -> Result<HandlerId, CommandError>
    where
        H: CommandHandler<Event = E>,
    {
        let mut state = self.lock();
        if let Some(err) = &state.closed {
            return Err(err.clone());
        }
        let id = HandlerId(state.next_id);
        state.next_id += 1;
        state.handlers.push_back(Entry {
            id,
            handler: Box::new(handler),
        });
        Ok(id)
    }

    /// Detach a handler. Returns false if it was not installed (already completed or removed).
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut state = self.lock();
        match state.handlers.iter().position(|e| e.id == id) {
            Some(pos) => {
                state.handlers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Route one event to the oldest installed handler.
    pub fn deliver(&self, event: &E) -> Delivery {
        let mut state = self.lock();
        let Some(front) = state.handlers.front_mut() else {
            return Delivery::Unclaimed;
        };
        let id = front.id;
        if front.handler.on_event(event) {
            state.handlers.pop_front();
            Delivery::Completed(id)
        } else {
            Delivery::Pending(id)
        }
    }

    /// Report a transport failure to every installed handler, detach them all, and refuse
    /// further installs. Returns the number of handlers notified.
    pub fn fail_all(&self, error: CommandError) -> usize {
        let mut state = self.lock();
        let drained: Vec<Entry<E>> = state.handlers.drain(..).collect();
        if state.closed.is_none() {
            state.closed = Some(error.clone());
        }
        let n = drained.len();
        for mut entry in drained {
            entry.handler.on_transport_error(&error);
        }
        n
    }

    /// Accept installs again (after a stream was replaced, e.g. STARTTLS).
    pub(crate) fn reopen(&self) {
        self.lock().closed = None;
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.lock().handlers.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::promise::{promise, Promise, ResultFuture};

    /// Completes on the first event equal to `done_on`, counting everything before it.
    struct Counter {
        promise: Promise<usize>,
        seen: usize,
        done_on: u32,
    }

    impl CommandHandler for Counter {
        type Event = u32;
        type Output = usize;

        fn on_event(&mut self, event: &u32) -> bool {
            self.seen += 1;
            if *event == self.done_on {
                self.promise.succeed(self.seen);
                true
            } else {
                false
            }
        }

        fn promise(&self) -> &Promise<usize> {
            &self.promise
        }
    }

    fn counter(done_on: u32) -> (Counter, ResultFuture<usize>) {
        let (promise, future) = promise();
        (Counter { promise, seen: 0, done_on }, future)
    }

    #[tokio::test]
    async fn completing_handler_detaches_itself() {
        let pipeline = Pipeline::new();
        let (h, f) = counter(3);
        let id = pipeline.install(h).unwrap();
        assert_eq!(pipeline.deliver(&1), Delivery::Pending(id));
        assert_eq!(pipeline.deliver(&3), Delivery::Completed(id));
        assert!(pipeline.is_empty());
        assert!(!pipeline.remove(id));
        assert_eq!(f.await, Ok(2));
    }

    #[test]
    fn events_without_handler_are_unclaimed() {
        let pipeline: Pipeline<u32> = Pipeline::new();
        assert_eq!(pipeline.deliver(&1), Delivery::Unclaimed);
    }

    #[test]
    fn remove_is_idempotent() {
        let pipeline = Pipeline::new();
        let (h, _f) = counter(9);
        let id = pipeline.install(h).unwrap();
        assert!(pipeline.contains(id));
        assert!(pipeline.remove(id));
        assert!(!pipeline.remove(id));
        assert_eq!(pipeline.deliver(&9), Delivery::Unclaimed);
    }

    #[tokio::test]
    async fn oldest_handler_receives_events() {
        let pipeline = Pipeline::new();
        let (first, f1) = counter(1);
        let (second, f2) = counter(1);
        let id1 = pipeline.install(first).unwrap();
        let id2 = pipeline.install(second).unwrap();
        assert_eq!(pipeline.deliver(&1), Delivery::Completed(id1));
        assert_eq!(pipeline.deliver(&1), Delivery::Completed(id2));
        assert_eq!(f1.await, Ok(1));
        assert_eq!(f2.await, Ok(1));
    }

    #[tokio::test]
    async fn transport_failure_resolves_all_and_closes() {
        let pipeline = Pipeline::new();
        let (a, fa) = counter(5);
        let (b, fb) = counter(5);
        pipeline.install(a).unwrap();
        pipeline.install(b).unwrap();
        let err = CommandError::transport("connection reset");
        assert_eq!(pipeline.fail_all(err.clone()), 2);
        assert!(pipeline.is_empty());
        assert_eq!(fa.await, Err(err.clone()));
        assert_eq!(fb.await, Err(err.clone()));

        let (c, _fc) = counter(5);
        assert_eq!(pipeline.install(c), Err(err));
        pipeline.reopen();
        let (d, _fd) = counter(5);
        assert!(pipeline.install(d).is_ok());
    }
}
