/*
 * response.rs
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

//! SMTP replies (RFC 5321 4.2): a three-digit code and one or more text lines.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest reply line accepted (RFC 5321 allows 512 octets; be lenient).
const MAX_LINE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    /// Text of each line, without code and separator.
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    /// Reply code class: 2 success, 3 intermediate, 4 transient failure, 5 permanent failure.
    pub fn class(&self) -> u16 {
        self.code / 100
    }

    pub fn is_positive(&self) -> bool {
        self.class() == 2
    }

    pub fn is_negative(&self) -> bool {
        self.code >= 400
    }

    /// All lines joined, as shown to users.
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }
}

/// Split one reply line into code, continuation flag and text.
fn parse_reply_line(line: &str) -> io::Result<(u16, bool, &str)> {
    let code = line
        .get(..3)
        .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse::<u16>().ok())
        .filter(|c| (100..600).contains(c))
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("malformed SMTP reply: {:?}", line))
        })?;
    match line.as_bytes().get(3) {
        None => Ok((code, false, "")),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed SMTP reply: {:?}", line),
        )),
    }
}

/// Read one CRLF-terminated line byte by byte, so nothing past it is consumed.
async fn read_line<R>(stream: &mut R, buf: &mut Vec<u8>) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    while !buf.ends_with(b"\r\n") {
        let mut b = [0u8; 1];
        let n = stream.read(&mut b).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"));
        }
        if buf.len() >= MAX_LINE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "SMTP reply line too long"));
        }
        buf.push(b[0]);
    }
    Ok(String::from_utf8_lossy(&buf[..buf.len() - 2]).into_owned())
}

/// Read one complete reply, following `NNN-` continuation lines to the final `NNN ` line.
pub async fn read_reply<R>(stream: &mut R, buf: &mut Vec<u8>) -> io::Result<SmtpReply>
where
    R: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    let mut first_code = None;
    loop {
        let line = read_line(stream, buf).await?;
        let (code, more, text) = parse_reply_line(&line)?;
        match first_code {
            None => first_code = Some(code),
            Some(c) if c != code => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("reply code changed mid-reply: {} then {}", c, code),
                ))
            }
            Some(_) => {}
        }
        lines.push(text.trim().to_string());
        if !more {
            return Ok(SmtpReply { code, lines });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(input: &[u8]) -> io::Result<SmtpReply> {
        let mut input = input;
        read_reply(&mut input, &mut Vec::new()).await
    }

    #[tokio::test]
    async fn single_line_reply() {
        let r = read(b"250 2.1.0 Ok\r\n").await.unwrap();
        assert_eq!(r.code, 250);
        assert_eq!(r.class(), 2);
        assert_eq!(r.message(), "2.1.0 Ok");
    }

    #[tokio::test]
    async fn multi_line_reply() {
        let r = read(b"250-mail.example.com\r\n250-PIPELINING\r\n250-SIZE 1000\r\n250 STARTTLS\r\n")
            .await
            .unwrap();
        assert_eq!(r.lines, vec!["mail.example.com", "PIPELINING", "SIZE 1000", "STARTTLS"]);
    }

    #[tokio::test]
    async fn bare_code_is_accepted() {
        let r = read(b"354\r\n").await.unwrap();
        assert_eq!(r.code, 354);
        assert_eq!(r.message(), "");
    }

    #[tokio::test]
    async fn malformed_replies_are_errors() {
        assert!(read(b"hello\r\n").await.is_err());
        assert!(read(b"250-first\r\n251 second\r\n").await.is_err());
        assert!(read(b"250-never ends\r\n").await.is_err());
    }

    #[tokio::test]
    async fn stops_after_the_final_line() {
        let mut input: &[u8] = b"220 ready\r\n250 next\r\n";
        let mut buf = Vec::new();
        assert_eq!(read_reply(&mut input, &mut buf).await.unwrap().code, 220);
        assert_eq!(read_reply(&mut input, &mut buf).await.unwrap().code, 250);
    }
}
