/*
 * promise.rs
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

//! Single-assignment result slot shared between a command handler and the dispatcher.
//!
//! [`Promise`] is the write side. It may be cloned (the handler owns one, the dispatcher's
//! timeout path holds another) but only the first `succeed`/`fail` takes effect; later attempts
//! return `false` and are otherwise ignored. [`ResultFuture`] is the single read side.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::CommandError;

type Slot<T> = Arc<Mutex<Option<oneshot::Sender<Result<T, CommandError>>>>>;

pub struct Promise<T> {
    slot: Slot<T>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Create a connected promise / future pair.
pub fn promise<T>() -> (Promise<T>, ResultFuture<T>) {
    let (tx, rx) = oneshot::channel();
    let promise = Promise {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (promise, ResultFuture { rx })
}

impl<T> Promise<T> {
    /// Resolve with a value. Returns false if already resolved.
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Resolve with an error. Returns false if already resolved.
    pub fn fail(&self, error: CommandError) -> bool {
        self.complete(Err(error))
    }

    pub fn complete(&self, result: Result<T, CommandError>) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // The reader may already be gone (caller dropped); the slot is still spent.
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self.slot.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Read side of a [`Promise`]. If every promise clone is dropped unresolved, yields
/// `TransportFailure` rather than hanging.
#[derive(Debug)]
pub struct ResultFuture<T> {
    rx: oneshot::Receiver<Result<T, CommandError>>,
}

impl<T> Future for ResultFuture<T> {
    type Output = Result<T, CommandError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CommandError::transport(
                "command handler dropped without a result",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_resolution_wins() {
        let (p, f) = promise::<u32>();
        assert!(p.succeed(7));
        assert!(!p.fail(CommandError::Timeout(Duration::from_secs(1))));
        assert!(!p.succeed(8));
        assert_eq!(f.await, Ok(7));
    }

    #[tokio::test]
    async fn clone_shares_the_slot() {
        let (p, f) = promise::<()>();
        let q = p.clone();
        assert!(q.fail(CommandError::invalid("x")));
        assert!(p.is_resolved());
        assert!(!p.succeed(()));
        assert_eq!(f.await, Err(CommandError::invalid("x")));
    }

    #[tokio::test]
    async fn dropped_promise_yields_transport_failure() {
        let (p, f) = promise::<()>();
        drop(p);
        assert!(matches!(f.await, Err(CommandError::TransportFailure(_))));
    }

    #[tokio::test]
    async fn resolving_after_reader_dropped_is_harmless() {
        let (p, f) = promise::<u8>();
        drop(f);
        assert!(p.succeed(1));
        assert!(p.is_resolved());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolution_has_one_winner() {
        for _ in 0..200 {
            let (p, f) = promise::<&'static str>();
            let a = p.clone();
            let b = p.clone();
            let t1 = tokio::spawn(async move { a.succeed("response") });
            let t2 = tokio::spawn(async move { b.fail(CommandError::Timeout(Duration::from_secs(30))) });
            let won_response = t1.await.unwrap();
            let won_timeout = t2.await.unwrap();
            assert!(won_response ^ won_timeout);
            let observed = f.await;
            if won_response {
                assert_eq!(observed, Ok("response"));
            } else {
                assert_eq!(observed, Err(CommandError::Timeout(Duration::from_secs(30))));
            }
        }
    }
}
