/*
 * plain.rs
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

//! PLAIN SASL (RFC 4616). Requires TLS.

/// PLAIN initial response: authzid NUL authcid NUL password (UTF-8).
/// Caller base64-encodes for the wire (e.g. SMTP "AUTH PLAIN <base64>").
pub fn encode_plain(authzid: &str, authcid: &str, password: &str) -> Vec<u8> {
    format!("{}\0{}\0{}", authzid, authcid, password).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_authzid() {
        assert_eq!(encode_plain("", "tim", "tanstaaftanstaaf"), b"\0tim\0tanstaaftanstaaf".to_vec());
    }
}
