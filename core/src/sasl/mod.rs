/*
 * mod.rs
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

//! SASL client side for IMAP AUTHENTICATE and SMTP AUTH with an initial response.

mod mechanism;
mod plain;
mod xoauth2;

pub use mechanism::SaslMechanism;
pub use plain::encode_plain;
pub use xoauth2::xoauth2_initial_response;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Raw initial response. For XOAUTH2, `authcid` is the email address and `secret` the access
/// token; for PLAIN, `secret` is the password.
pub fn initial_response(mechanism: SaslMechanism, authcid: &str, secret: &str) -> Vec<u8> {
    match mechanism {
        SaslMechanism::Plain => encode_plain("", authcid, secret),
        SaslMechanism::XOAuth2 => xoauth2_initial_response(authcid, secret),
    }
}

/// Base64 initial response as sent after the mechanism name.
pub fn initial_response_base64(mechanism: SaslMechanism, authcid: &str, secret: &str) -> String {
    STANDARD.encode(initial_response(mechanism, authcid, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_base64() {
        // RFC 4616 example without authzid.
        assert_eq!(
            initial_response_base64(SaslMechanism::Plain, "tim", "tanstaaftanstaaf"),
            "AHRpbQB0YW5zdGFhZnRhbnN0YWFm"
        );
    }
}
