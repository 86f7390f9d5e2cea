/*
 * dot_stuffer.rs
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

//! Dot stuffing for SMTP DATA (RFC 5321 4.5.2): a line beginning with `.` gets a second `.`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// At the start of a line (including the start of the message).
    LineStart,
    Normal,
    SawCr,
}

/// Streaming dot stuffer; chunks may split CRLF anywhere.
#[derive(Debug)]
pub struct DotStuffer {
    state: State,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            state: State::LineStart,
        }
    }
}

impl DotStuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a chunk; call `out` for each slice to send.
    pub fn process_chunk<F>(&mut self, chunk: &[u8], mut out: F)
    where
        F: FnMut(&[u8]),
    {
        let mut start = 0;
        for (i, &b) in chunk.iter().enumerate() {
            if self.state == State::LineStart && b == b'.' {
                out(&chunk[start..i]);
                out(b".");
                start = i;
            }
            self.state = match (self.state, b) {
                (_, b'\r') => State::SawCr,
                (State::SawCr, b'\n') => State::LineStart,
                _ => State::Normal,
            };
        }
        if start < chunk.len() {
            out(&chunk[start..]);
        }
    }

    /// Emit the end-of-data marker, completing the last line if needed; reset state.
    pub fn end_message<F>(&mut self, mut out: F)
    where
        F: FnMut(&[u8]),
    {
        match self.state {
            State::LineStart => out(b".\r\n"),
            State::Normal | State::SawCr => out(b"\r\n.\r\n"),
        }
        self.state = State::LineStart;
    }
}

/// Stuff a whole message and append the terminator.
pub fn stuff_message(message: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(message.len() + 16);
    let mut stuffer = DotStuffer::new();
    stuffer.process_chunk(message, |s| data.extend_from_slice(s));
    stuffer.end_message(|s| data.extend_from_slice(s));
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_dot_on_first_line_is_doubled() {
        assert_eq!(stuff_message(b".hidden\r\n"), b"..hidden\r\n.\r\n");
    }

    #[test]
    fn dot_after_crlf_is_doubled() {
        assert_eq!(stuff_message(b"Hi\r\n.\r\nBye"), b"Hi\r\n..\r\nBye\r\n.\r\n");
    }

    #[test]
    fn dots_elsewhere_are_untouched() {
        assert_eq!(stuff_message(b"a.b\r\nc..d\r\n"), b"a.b\r\nc..d\r\n.\r\n");
    }

    #[test]
    fn chunk_boundary_inside_crlf() {
        let mut s = DotStuffer::new();
        let mut out = Vec::new();
        s.process_chunk(b"line\r", |x| out.extend_from_slice(x));
        s.process_chunk(b"\n.dot", |x| out.extend_from_slice(x));
        s.end_message(|x| out.extend_from_slice(x));
        assert_eq!(out, b"line\r\n..dot\r\n.\r\n");
    }

    #[test]
    fn bare_lf_does_not_start_a_line() {
        assert_eq!(stuff_message(b"a\n.b\r\n"), b"a\n.b\r\n.\r\n");
    }
}
