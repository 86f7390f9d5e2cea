/*
 * dispatcher.rs
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

//! Command dispatcher: runs one command's lifecycle on a connection.
//!
//! validate -> allocate tag -> install handler -> write request -> await promise under a
//! deadline -> remove handler. The writer lock is held for the whole lifecycle, which makes it
//! the serialization point: a command's handler is installed only after the previous command's
//! handler has been removed, so replies cannot be matched to the wrong request and commands
//! complete in issuance order.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::command::pipeline::{Delivery, HandlerId, Pipeline};
use crate::command::promise::promise;
use crate::command::tag::{Tag, TagAllocator};
use crate::command::{Command, Protocol, WireRequest};
use crate::error::CommandError;

/// One logical session's outbound half plus its pipeline. Inbound events arrive through the
/// [`EventSink`] returned by [`Connection::new`].
pub struct Connection<P: Protocol, W> {
    pipeline: Arc<Pipeline<P::Event>>,
    tags: TagAllocator,
    /// Held across a command's whole lifecycle. `None` while the stream is detached.
    writer: AsyncMutex<Option<W>>,
    default_timeout: Duration,
    _protocol: PhantomData<fn() -> P>,
}

/// Feed for the transport/parser side: delivers parsed events and transport failures.
pub struct EventSink<P: Protocol> {
    pipeline: Arc<Pipeline<P::Event>>,
}

impl<P: Protocol> Clone for EventSink<P> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<P: Protocol> EventSink<P> {
    /// Hand one inbound event to the installed handler. Events arriving with no handler
    /// installed (unsolicited data, late replies to timed-out commands) are dropped.
    pub fn deliver(&self, event: P::Event) -> Delivery {
        let delivery = self.pipeline.deliver(&event);
        match delivery {
            Delivery::Unclaimed => {
                debug!(protocol = P::NAME, ?event, "no command in flight, dropping event")
            }
            Delivery::Pending(id) => trace!(protocol = P::NAME, ?id, ?event, "event accumulated"),
            Delivery::Completed(id) => trace!(protocol = P::NAME, ?id, ?event, "command completed"),
        }
        delivery
    }

    /// The connection failed: resolve every in-flight command with `error` and refuse new ones.
    pub fn transport_error(&self, error: CommandError) {
        let n = self.pipeline.fail_all(error.clone());
        warn!(protocol = P::NAME, %error, in_flight = n, "transport failed");
    }
}

/// Removes an installed handler when the lifecycle ends, including when the caller drops the
/// `execute` future mid-flight.
struct InstallGuard<'a, E> {
    pipeline: &'a Pipeline<E>,
    id: HandlerId,
}

impl<E> Drop for InstallGuard<'_, E> {
    fn drop(&mut self) {
        self.pipeline.remove(self.id);
    }
}

async fn write_request<W>(writer: &mut W, request: &WireRequest) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(request.as_bytes()).await?;
    writer.flush().await
}

impl<P, W> Connection<P, W>
where
    P: Protocol,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap the outbound half of a connected stream.
    pub fn new(writer: W, default_timeout: Duration) -> (Self, EventSink<P>) {
        let pipeline = Arc::new(Pipeline::new());
        let sink = EventSink {
            pipeline: Arc::clone(&pipeline),
        };
        let connection = Self {
            pipeline,
            tags: TagAllocator::new(),
            writer: AsyncMutex::new(Some(writer)),
            default_timeout,
            _protocol: PhantomData,
        };
        (connection, sink)
    }

    pub fn event_sink(&self) -> EventSink<P> {
        EventSink {
            pipeline: Arc::clone(&self.pipeline),
        }
    }

    pub fn pipeline(&self) -> &Pipeline<P::Event> {
        &self.pipeline
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run a command with its own timeout, or the connection default.
    pub async fn execute<C>(&self, command: C) -> Result<C::Output, CommandError>
    where
        C: Command<Protocol = P>,
    {
        let timeout = command.timeout().unwrap_or(self.default_timeout);
        self.execute_with_timeout(command, timeout).await
    }

    pub async fn execute_with_timeout<C>(
        &self,
        command: C,
        timeout: Duration,
    ) -> Result<C::Output, CommandError>
    where
        C: Command<Protocol = P>,
    {
        if let Err(e) = command.validate() {
            debug!(protocol = P::NAME, command = command.name(), error = %e, "validation failed");
            return Err(e);
        }

        let mut writer = self.writer.lock().await;
        let Some(stream) = writer.as_mut() else {
            return Err(CommandError::transport("connection has no stream attached"));
        };

        let tag: Option<Tag> = if P::TAGGED { Some(self.tags.next()) } else { None };
        let (promise, mut future) = promise();
        let handler = command.handler(tag.clone(), promise.clone());
        let id = self.pipeline.install(handler)?;
        let _installed = InstallGuard {
            pipeline: &self.pipeline,
            id,
        };

        let request = command.encode(tag.as_ref());
        debug!(
            protocol = P::NAME,
            command = command.name(),
            tag = tag.as_ref().map(Tag::as_str),
            ?request,
            "sending command"
        );
        if let Err(e) = write_request(stream, &request).await {
            let error = CommandError::from(e);
            warn!(protocol = P::NAME, command = command.name(), %error, "write failed");
            self.pipeline.fail_all(error);
        }

        let result = match tokio::time::timeout(timeout, &mut future).await {
            Ok(result) => result,
            Err(_) => {
                if promise.fail(CommandError::Timeout(timeout)) {
                    warn!(
                        protocol = P::NAME,
                        command = command.name(),
                        tag = tag.as_ref().map(Tag::as_str),
                        ?timeout,
                        "command timed out"
                    );
                }
                // Resolved by now, either by the timeout above or by a racing reply.
                future.await
            }
        };
        debug!(
            protocol = P::NAME,
            command = command.name(),
            ok = result.is_ok(),
            "command finished"
        );
        result
    }

    /// Take the stream away (e.g. to upgrade it to TLS). Waits for the command in flight.
    pub async fn detach_writer(&self) -> Option<W> {
        self.writer.lock().await.take()
    }

    /// Put a (possibly new) stream in place and accept commands again.
    pub async fn attach_writer(&self, writer: W) {
        let mut guard = self.writer.lock().await;
        *guard = Some(writer);
        self.pipeline.reopen();
    }

    /// Shut down the outbound half and fail anything still installed.
    pub async fn close(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut w) = writer {
            if let Err(e) = w.shutdown().await {
                debug!(protocol = P::NAME, error = %e, "shutdown failed");
            }
        }
        self.pipeline
            .fail_all(CommandError::transport("connection closed"));
    }
}
