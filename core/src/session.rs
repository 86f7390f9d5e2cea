/*
 * session.rs
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

//! A running protocol session: the greeting exchange, a reader task that parses inbound
//! events and feeds them to the connection's pipeline, and the stream hand-off STARTTLS needs.

use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::command::{Command, Connection, EventSink, Protocol};
use crate::error::CommandError;

struct ReaderTask<S> {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Option<ReadHalf<S>>>,
}

/// One connected session for protocol `P` over stream `S`.
pub struct Session<P: Protocol, S> {
    connection: Connection<P, WriteHalf<S>>,
    reader: Mutex<Option<ReaderTask<S>>>,
}

/// Read and check the server greeting before any command is issued.
pub async fn read_greeting<P, S>(stream: &mut S, timeout: Duration) -> Result<P::Event, CommandError>
where
    P: Protocol,
    S: AsyncRead + Unpin + Send,
{
    let mut buf = Vec::new();
    let greeting = match tokio::time::timeout(timeout, P::read_event(stream, &mut buf)).await {
        Ok(result) => result?,
        Err(_) => return Err(CommandError::Timeout(timeout)),
    };
    debug!(protocol = P::NAME, ?greeting, "greeting");
    P::check_greeting(&greeting)?;
    Ok(greeting)
}

/// Parse events until stopped or the stream fails. Returns the read half when stopped so the
/// stream can be reassembled.
async fn read_loop<P, S>(
    mut reader: ReadHalf<S>,
    sink: EventSink<P>,
    mut stop: oneshot::Receiver<()>,
) -> Option<ReadHalf<S>>
where
    P: Protocol,
    S: AsyncRead + Send,
{
    let mut buf = Vec::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = &mut stop => None,
            event = P::read_event(&mut reader, &mut buf) => Some(event),
        };
        match next {
            None => {
                trace!(protocol = P::NAME, "reader stopped");
                return Some(reader);
            }
            Some(Ok(event)) => {
                sink.deliver(event);
            }
            Some(Err(e)) => {
                sink.transport_error(CommandError::from(e));
                return None;
            }
        }
    }
}

impl<P, S> Session<P, S>
where
    P: Protocol,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Start a session on a stream whose greeting has already been consumed.
    pub fn start(stream: S, default_timeout: Duration) -> Self {
        let (read, write) = split(stream);
        let (connection, sink) = Connection::new(write, default_timeout);
        let session = Self {
            connection,
            reader: Mutex::new(None),
        };
        session.spawn_reader(read, sink);
        session
    }

    /// Read the greeting, then start the session.
    pub async fn open(
        mut stream: S,
        greeting_timeout: Duration,
        default_timeout: Duration,
    ) -> Result<(Self, P::Event), CommandError> {
        let greeting = read_greeting::<P, S>(&mut stream, greeting_timeout).await?;
        Ok((Self::start(stream, default_timeout), greeting))
    }

    fn spawn_reader(&self, read: ReadHalf<S>, sink: EventSink<P>) {
        let (stop, stopped) = oneshot::channel();
        let handle = tokio::spawn(read_loop::<P, S>(read, sink, stopped));
        let task = ReaderTask { stop, handle };
        if let Ok(mut slot) = self.reader.lock() {
            if let Some(old) = slot.replace(task) {
                old.handle.abort();
            }
        }
    }

    pub fn connection(&self) -> &Connection<P, WriteHalf<S>> {
        &self.connection
    }

    pub async fn execute<C>(&self, command: C) -> Result<C::Output, CommandError>
    where
        C: Command<Protocol = P>,
    {
        self.connection.execute(command).await
    }

    /// Stop the reader and reassemble the stream. Commands issued meanwhile fail until
    /// [`Session::resume`] is called.
    pub async fn take_stream(&self) -> Result<S, CommandError> {
        let task = self.reader.lock().ok().and_then(|mut slot| slot.take());
        let write = self.connection.detach_writer().await;
        let read = match task {
            Some(task) => {
                let _ = task.stop.send(());
                task.handle
                    .await
                    .map_err(|e| CommandError::transport(format!("reader task failed: {}", e)))?
            }
            None => None,
        };
        match (read, write) {
            (Some(read), Some(write)) => Ok(read.unsplit(write)),
            _ => Err(CommandError::transport("connection is no longer usable")),
        }
    }

    /// Continue the session over `stream` (typically the TLS-upgraded one).
    pub async fn resume(&self, stream: S) {
        let (read, write) = split(stream);
        self.connection.attach_writer(write).await;
        self.spawn_reader(read, self.connection.event_sink());
    }

    /// Shut the connection down; anything in flight fails.
    pub async fn close(&self) {
        self.connection.close().await;
        if let Some(task) = self.reader.lock().ok().and_then(|mut slot| slot.take()) {
            task.handle.abort();
        }
    }
}

impl<P: Protocol, S> Drop for Session<P, S> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.reader.lock() {
            if let Some(task) = slot.take() {
                task.handle.abort();
            }
        }
    }
}
