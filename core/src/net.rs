/*
 * net.rs
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

//! TCP and TLS transport: plain connections that may later upgrade via STARTTLS, and implicit
//! TLS connections that handshake immediately.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// How the transport is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Cleartext for the whole session.
    Plain,
    /// Cleartext until the client issues STARTTLS, then TLS (IMAP 143, SMTP 587).
    #[default]
    StartTls,
    /// TLS from the first byte (IMAPS 993, SMTPS 465).
    Implicit,
}

/// Root store: platform native certs first, Mozilla roots when none load.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = root_store.add_parsable_certificates(certs);
            debug!(added, ignored, "loaded native root certificates");
        }
        Err(e) => warn!(error = %e, "could not load native root certificates"),
    }
    if root_store.is_empty() {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    root_store
}

static DEFAULT_CONNECTOR: OnceLock<TlsConnector> = OnceLock::new();

fn default_connector() -> &'static TlsConnector {
    DEFAULT_CONNECTOR.get_or_init(|| {
        let config = ClientConfig::builder()
            .with_root_certificates(build_root_store())
            .with_no_client_auth();
        TlsConnector::from(Arc::new(config))
    })
}

fn server_name(host: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid host name: {}", host)))
}

async fn tls_handshake(host: &str, tcp: TcpStream) -> io::Result<TlsStream<TcpStream>> {
    default_connector()
        .connect(server_name(host)?, tcp)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))
}

/// A mail server connection, plain or TLS.
pub enum MailStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl MailStream {
    /// Connect and, for [`Security::Implicit`], complete the TLS handshake. The whole
    /// operation is bounded by `timeout`.
    pub async fn connect(host: &str, port: u16, security: Security, timeout: Duration) -> io::Result<Self> {
        match tokio::time::timeout(timeout, Self::open(host, port, security)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {}:{} timed out", host, port),
            )),
        }
    }

    async fn open(host: &str, port: u16, security: Security) -> io::Result<Self> {
        let tcp = TcpStream::connect((host, port)).await?;
        match security {
            Security::Implicit => Ok(MailStream::Tls(Box::new(tls_handshake(host, tcp).await?))),
            Security::Plain | Security::StartTls => Ok(MailStream::Plain(tcp)),
        }
    }

    /// Upgrade after the server accepted STARTTLS. Already-secure streams are returned as is.
    pub async fn upgrade_to_tls(self, host: &str) -> io::Result<Self> {
        match self {
            MailStream::Plain(tcp) => Ok(MailStream::Tls(Box::new(tls_handshake(host, tcp).await?))),
            tls @ MailStream::Tls(_) => Ok(tls),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, MailStream::Tls(_))
    }
}

impl AsyncRead for MailStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MailStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_flush(cx),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MailStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            MailStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
