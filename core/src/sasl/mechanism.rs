/*
 * mechanism.rs
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

//! SASL mechanism names and metadata.

/// Single-shot mechanisms: the whole exchange is the initial response (SASL-IR), so no
/// continuation round-trips are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslMechanism {
    /// PLAIN (RFC 4616). Requires TLS.
    Plain,
    /// XOAUTH2: OAuth2 bearer token (Gmail, Outlook).
    XOAuth2,
}

impl SaslMechanism {
    pub fn name(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::XOAuth2 => "XOAUTH2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "PLAIN" => Some(SaslMechanism::Plain),
            "XOAUTH2" => Some(SaslMechanism::XOAuth2),
            _ => None,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_case_insensitively() {
        assert_eq!(SaslMechanism::from_name(" plain "), Some(SaslMechanism::Plain));
        assert_eq!(SaslMechanism::from_name("XOAuth2"), Some(SaslMechanism::XOAuth2));
        assert_eq!(SaslMechanism::from_name("CRAM-MD5"), None);
        assert_eq!(SaslMechanism::XOAuth2.to_string(), "XOAUTH2");
    }
}
