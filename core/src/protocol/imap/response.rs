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

//! IMAP response events and the line-level framing that produces them.
//!
//! Only the structure the correlation engine and its handlers act on is classified: tag,
//! status, bracketed response codes, and the untagged data SELECT/CAPABILITY/LIST need.
//! Everything else is passed through as [`Untagged::Other`] with its literals.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::command::Tag;

/// Largest literal accepted from the server.
const MAX_LITERAL: u32 = 64 * 1024 * 1024;

/// Longest line accepted outside literals.
const MAX_LINE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImapStatus {
    Ok,
    No,
    Bad,
    PreAuth,
    Bye,
}

impl ImapStatus {
    fn from_atom(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Some(ImapStatus::Ok),
            "NO" => Some(ImapStatus::No),
            "BAD" => Some(ImapStatus::Bad),
            "PREAUTH" => Some(ImapStatus::PreAuth),
            "BYE" => Some(ImapStatus::Bye),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImapStatus::Ok => "OK",
            ImapStatus::No => "NO",
            ImapStatus::Bad => "BAD",
            ImapStatus::PreAuth => "PREAUTH",
            ImapStatus::Bye => "BYE",
        }
    }
}

/// Bracketed response code, e.g. `[UIDVALIDITY 3857529045]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    Alert,
    Capability(Vec<String>),
    PermanentFlags(Vec<String>),
    ReadOnly,
    ReadWrite,
    TryCreate,
    UidNext(u32),
    UidValidity(u32),
    Unseen(u32),
    Other(String),
}

/// Status line body: `OK [code] text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: ImapStatus,
    pub code: Option<ResponseCode>,
    pub text: String,
}

impl StatusResponse {
    /// Server text including the bracketed code, as shown to users.
    pub fn message(&self) -> String {
        match &self.code {
            Some(ResponseCode::Other(c)) => format!("[{}] {}", c, self.text),
            _ => self.text.clone(),
        }
    }
}

/// Parsed LIST response entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub attributes: Vec<String>,
    pub delimiter: Option<char>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    Status(StatusResponse),
    Capability(Vec<String>),
    Flags(Vec<String>),
    Exists(u32),
    Recent(u32),
    Expunge(u32),
    List(ListEntry),
    Other {
        line: String,
        literals: Vec<Vec<u8>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImapResponse {
    Tagged { tag: Tag, response: StatusResponse },
    Untagged(Untagged),
    Continuation(String),
}

/// Classify one logical response line (literals already removed).
pub fn parse_response(line: &str, literals: Vec<Vec<u8>>) -> ImapResponse {
    if let Some(rest) = line.strip_prefix('+') {
        return ImapResponse::Continuation(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("* ") {
        return ImapResponse::Untagged(parse_untagged(rest.trim_start(), line, literals));
    }
    let mut sp = line.splitn(2, ' ');
    let tag = sp.next().unwrap_or("");
    let rest = sp.next().unwrap_or("");
    let response = parse_status(rest).unwrap_or_else(|| StatusResponse {
        status: ImapStatus::Bad,
        code: None,
        text: format!("malformed tagged response: {}", line),
    });
    ImapResponse::Tagged {
        tag: Tag::new(tag),
        response,
    }
}

fn parse_untagged(rest: &str, line: &str, literals: Vec<Vec<u8>>) -> Untagged {
    let mut sp = rest.splitn(2, ' ');
    let first = sp.next().unwrap_or("");
    let after = sp.next().unwrap_or("").trim();
    if let Ok(n) = first.parse::<u32>() {
        let keyword = after.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        match keyword.as_str() {
            "EXISTS" => return Untagged::Exists(n),
            "RECENT" => return Untagged::Recent(n),
            "EXPUNGE" => return Untagged::Expunge(n),
            _ => {}
        }
    } else if let Some(status) = parse_status(rest) {
        return Untagged::Status(status);
    } else {
        match first.to_ascii_uppercase().as_str() {
            "CAPABILITY" => return Untagged::Capability(parse_atoms(after)),
            "FLAGS" => {
                if let Some(flags) = parse_paren_list(after) {
                    return Untagged::Flags(flags);
                }
            }
            "LIST" => {
                if let Some(entry) = parse_list(after) {
                    return Untagged::List(entry);
                }
            }
            _ => {}
        }
    }
    Untagged::Other {
        line: line.to_string(),
        literals,
    }
}

/// `OK [CODE args] text`, `NO text`, `BYE`.
fn parse_status(s: &str) -> Option<StatusResponse> {
    let s = s.trim_start();
    let (atom, after) = match s.find(' ') {
        Some(i) => (&s[..i], s[i + 1..].trim_start()),
        None => (s, ""),
    };
    let status = ImapStatus::from_atom(atom)?;
    let (code, text) = match after.strip_prefix('[') {
        Some(inner) => match inner.find(']') {
            Some(end) => (Some(parse_code(&inner[..end])), inner[end + 1..].trim()),
            None => (None, after),
        },
        None => (None, after),
    };
    Some(StatusResponse {
        status,
        code,
        text: text.to_string(),
    })
}

fn parse_code(inner: &str) -> ResponseCode {
    let (key, args) = match inner.find(' ') {
        Some(i) => (&inner[..i], inner[i + 1..].trim()),
        None => (inner, ""),
    };
    let number = || args.split_whitespace().next().and_then(|n| n.parse::<u32>().ok());
    let parsed = match key.to_ascii_uppercase().as_str() {
        "ALERT" => Some(ResponseCode::Alert),
        "CAPABILITY" => Some(ResponseCode::Capability(parse_atoms(args))),
        "PERMANENTFLAGS" => parse_paren_list(args).map(ResponseCode::PermanentFlags),
        "READ-ONLY" => Some(ResponseCode::ReadOnly),
        "READ-WRITE" => Some(ResponseCode::ReadWrite),
        "TRYCREATE" => Some(ResponseCode::TryCreate),
        "UIDNEXT" => number().map(ResponseCode::UidNext),
        "UIDVALIDITY" => number().map(ResponseCode::UidValidity),
        "UNSEEN" => number().map(ResponseCode::Unseen),
        _ => None,
    };
    parsed.unwrap_or_else(|| ResponseCode::Other(inner.to_string()))
}

/// Capability atoms, upper-cased.
fn parse_atoms(s: &str) -> Vec<String> {
    s.split_whitespace().map(|w| w.to_ascii_uppercase()).collect()
}

/// `(\Seen \Answered)` -> ["\Seen", "\Answered"].
fn parse_paren_list(s: &str) -> Option<Vec<String>> {
    let s = s.trim_start().strip_prefix('(')?;
    let end = s.find(')')?;
    Some(s[..end].split_whitespace().map(|w| w.to_string()).collect())
}

/// `(\HasNoChildren) "/" "INBOX"`.
fn parse_list(s: &str) -> Option<ListEntry> {
    let s = s.trim_start();
    let attributes = parse_paren_list(s)?;
    let rest = s[s.find(')')? + 1..].trim_start();
    let (delimiter, rest) = if rest.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("NIL")) {
        (None, &rest[3..])
    } else if let Some(quoted) = rest.strip_prefix('"') {
        let (d, consumed) = read_quoted(quoted)?;
        (d.chars().next(), &quoted[consumed..])
    } else {
        (None, rest)
    };
    let rest = rest.trim_start();
    let name = match rest.strip_prefix('"') {
        Some(quoted) => read_quoted(quoted)?.0,
        None => rest.split_whitespace().next()?.to_string(),
    };
    Some(ListEntry {
        attributes,
        delimiter,
        name,
    })
}

/// Read a quoted string body (after the opening quote). Returns (unescaped, bytes consumed
/// including the closing quote).
fn read_quoted(s: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?.1),
            '"' => return Some((out, i + 1)),
            _ => out.push(c),
        }
    }
    None
}

/// Size of a trailing `{N}` literal marker on a raw line, if any.
fn literal_size(line: &str) -> Option<u32> {
    let open = line.rfind('{')?;
    let inner = line[open + 1..].strip_suffix('}')?;
    inner.trim_end_matches('+').trim().parse().ok()
}

/// Read one raw CRLF-terminated line into `buf` (without the CRLF).
async fn read_raw_line<R>(stream: &mut R, buf: &mut Vec<u8>) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    loop {
        let mut b = [0u8; 1];
        let n = stream.read(&mut b).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"));
        }
        if buf.len() >= MAX_LINE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "IMAP response line too long"));
        }
        buf.push(b[0]);
        if buf.ends_with(b"\r\n") {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf[..buf.len() - 2]).into_owned())
}

/// Read one logical response: a line, and for every `{N}` marker the N literal bytes plus the
/// line continuation that follows them. Literal markers stay in the returned line text.
pub async fn read_response_line<R>(
    stream: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<(String, Vec<Vec<u8>>)>
where
    R: AsyncRead + Unpin,
{
    let mut line = read_raw_line(stream, buf).await?;
    let mut literals = Vec::new();
    while let Some(n) = literal_size(&line) {
        if n > MAX_LITERAL {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("literal of {} bytes exceeds limit", n),
            ));
        }
        let mut lit = vec![0u8; n as usize];
        stream.read_exact(&mut lit).await?;
        literals.push(lit);
        let continuation = read_raw_line(stream, buf).await?;
        line.push_str(&continuation);
    }
    Ok((line.trim_end().to_string(), literals))
}
