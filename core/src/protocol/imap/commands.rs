/*
 * commands.rs
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

//! Typed IMAP commands. Each names its handler; the dispatcher supplies the tag.

use super::handlers::{CapabilityHandler, CompletionHandler, ListHandler, SelectHandler};
use super::mailbox::MailboxStatus;
use super::response::ListEntry;
use super::Imap;
use crate::command::{Command, Promise, Tag, WireRequest};
use crate::error::CommandError;
use crate::sasl::{initial_response_base64, SaslMechanism};

/// IMAP quoted string: backslash-escape `\` and `"`.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Quoted strings cannot carry CR, LF or NUL.
fn check_quotable(what: &str, value: &str) -> Result<(), CommandError> {
    if value.contains(['\r', '\n', '\0']) {
        return Err(CommandError::invalid(format!("{} cannot contain CR, LF or NUL", what)));
    }
    Ok(())
}

fn check_mailbox(name: &str) -> Result<(), CommandError> {
    if name.is_empty() {
        return Err(CommandError::invalid("Mailbox name cannot be empty"));
    }
    check_quotable("Mailbox name", name)
}

fn tagged(tag: Option<&Tag>, body: &str) -> WireRequest {
    match tag {
        Some(t) => WireRequest::line(format!("{} {}", t, body)),
        None => WireRequest::line(body),
    }
}

/// SELECT: open a mailbox read-write.
#[derive(Debug, Clone)]
pub struct SelectMailboxCommand {
    pub mailbox: String,
}

impl SelectMailboxCommand {
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
        }
    }
}

impl Command for SelectMailboxCommand {
    type Protocol = Imap;
    type Output = MailboxStatus;
    type Handler = SelectHandler;

    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn validate(&self) -> Result<(), CommandError> {
        check_mailbox(&self.mailbox)
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        tagged(tag, &format!("SELECT {}", quote_string(&self.mailbox)))
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<MailboxStatus>) -> SelectHandler {
        SelectHandler::new(tag, promise)
    }
}

/// EXAMINE: open a mailbox read-only.
#[derive(Debug, Clone)]
pub struct ExamineMailboxCommand {
    pub mailbox: String,
}

impl ExamineMailboxCommand {
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
        }
    }
}

impl Command for ExamineMailboxCommand {
    type Protocol = Imap;
    type Output = MailboxStatus;
    type Handler = SelectHandler;

    fn name(&self) -> &'static str {
        "EXAMINE"
    }

    fn validate(&self) -> Result<(), CommandError> {
        check_mailbox(&self.mailbox)
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        tagged(tag, &format!("EXAMINE {}", quote_string(&self.mailbox)))
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<MailboxStatus>) -> SelectHandler {
        SelectHandler::new(tag, promise)
    }
}

/// Commands taking one mailbox name and yielding only the tagged OK.
macro_rules! mailbox_command {
    ($(#[$doc:meta])* $name:ident, $verb:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub mailbox: String,
        }

        impl $name {
            pub fn new(mailbox: impl Into<String>) -> Self {
                Self {
                    mailbox: mailbox.into(),
                }
            }
        }

        impl Command for $name {
            type Protocol = Imap;
            type Output = ();
            type Handler = CompletionHandler;

            fn name(&self) -> &'static str {
                $verb
            }

            fn validate(&self) -> Result<(), CommandError> {
                check_mailbox(&self.mailbox)
            }

            fn encode(&self, tag: Option<&Tag>) -> WireRequest {
                tagged(tag, &format!(concat!($verb, " {}"), quote_string(&self.mailbox)))
            }

            fn handler(&self, tag: Option<Tag>, promise: Promise<()>) -> CompletionHandler {
                CompletionHandler::new(tag, promise)
            }
        }
    };
}

mailbox_command!(
    /// CREATE a new mailbox.
    CreateCommand,
    "CREATE"
);
mailbox_command!(
    /// DELETE an existing mailbox.
    DeleteCommand,
    "DELETE"
);
mailbox_command!(
    /// SUBSCRIBE to a mailbox.
    SubscribeCommand,
    "SUBSCRIBE"
);
mailbox_command!(
    /// UNSUBSCRIBE from a mailbox.
    UnsubscribeCommand,
    "UNSUBSCRIBE"
);

/// Commands with no arguments that yield only the tagged OK. Always valid.
macro_rules! bare_command {
    ($(#[$doc:meta])* $name:ident, $verb:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Command for $name {
            type Protocol = Imap;
            type Output = ();
            type Handler = CompletionHandler;

            fn name(&self) -> &'static str {
                $verb
            }

            fn encode(&self, tag: Option<&Tag>) -> WireRequest {
                tagged(tag, $verb)
            }

            fn handler(&self, tag: Option<Tag>, promise: Promise<()>) -> CompletionHandler {
                CompletionHandler::new(tag, promise)
            }
        }
    };
}

bare_command!(
    /// CLOSE the selected mailbox, expunging messages marked \Deleted.
    CloseCommand,
    "CLOSE"
);
bare_command!(
    /// UNSELECT (RFC 3691): leave the selected mailbox without expunging.
    UnselectCommand,
    "UNSELECT"
);
bare_command!(NoopCommand, "NOOP");
bare_command!(
    /// LOGOUT. The server's untagged BYE precedes the tagged OK.
    LogoutCommand,
    "LOGOUT"
);
bare_command!(
    /// STARTTLS. On OK the caller must upgrade the stream before issuing anything else.
    StartTlsCommand,
    "STARTTLS"
);

/// RENAME a mailbox.
#[derive(Debug, Clone)]
pub struct RenameCommand {
    pub from: String,
    pub to: String,
}

impl RenameCommand {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Command for RenameCommand {
    type Protocol = Imap;
    type Output = ();
    type Handler = CompletionHandler;

    fn name(&self) -> &'static str {
        "RENAME"
    }

    fn validate(&self) -> Result<(), CommandError> {
        check_mailbox(&self.from)?;
        check_mailbox(&self.to)
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        tagged(
            tag,
            &format!("RENAME {} {}", quote_string(&self.from), quote_string(&self.to)),
        )
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<()>) -> CompletionHandler {
        CompletionHandler::new(tag, promise)
    }
}

/// LIST reference pattern.
#[derive(Debug, Clone)]
pub struct ListCommand {
    pub reference: String,
    pub pattern: String,
}

impl Default for ListCommand {
    /// Every mailbox: `LIST "" "*"`.
    fn default() -> Self {
        Self {
            reference: String::new(),
            pattern: "*".to_string(),
        }
    }
}

impl Command for ListCommand {
    type Protocol = Imap;
    type Output = Vec<ListEntry>;
    type Handler = ListHandler;

    fn name(&self) -> &'static str {
        "LIST"
    }

    fn validate(&self) -> Result<(), CommandError> {
        check_quotable("LIST reference", &self.reference)?;
        check_quotable("LIST pattern", &self.pattern)
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        tagged(
            tag,
            &format!("LIST {} {}", quote_string(&self.reference), quote_string(&self.pattern)),
        )
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<Vec<ListEntry>>) -> ListHandler {
        ListHandler::new(tag, promise)
    }
}

/// CAPABILITY.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityCommand;

impl Command for CapabilityCommand {
    type Protocol = Imap;
    type Output = Vec<String>;
    type Handler = CapabilityHandler;

    fn name(&self) -> &'static str {
        "CAPABILITY"
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        tagged(tag, "CAPABILITY")
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<Vec<String>>) -> CapabilityHandler {
        CapabilityHandler::new(tag, promise)
    }
}

/// LOGIN with a plaintext password. Only use over TLS.
#[derive(Clone)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCommand")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl LoginCommand {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Command for LoginCommand {
    type Protocol = Imap;
    type Output = ();
    type Handler = CompletionHandler;

    fn name(&self) -> &'static str {
        "LOGIN"
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.username.is_empty() {
            return Err(CommandError::invalid("Username cannot be empty"));
        }
        check_quotable("Username", &self.username)?;
        check_quotable("Password", &self.password)
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        tagged(
            tag,
            &format!("LOGIN {} {}", quote_string(&self.username), quote_string(&self.password)),
        )
        .sensitive()
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<()>) -> CompletionHandler {
        CompletionHandler::new(tag, promise)
    }
}

/// AUTHENTICATE with a SASL initial response (RFC 4959 SASL-IR).
#[derive(Clone)]
pub struct AuthenticateCommand {
    pub mechanism: SaslMechanism,
    pub authcid: String,
    pub secret: String,
}

impl std::fmt::Debug for AuthenticateCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateCommand")
            .field("mechanism", &self.mechanism)
            .field("authcid", &self.authcid)
            .finish_non_exhaustive()
    }
}

impl AuthenticateCommand {
    pub fn new(mechanism: SaslMechanism, authcid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            mechanism,
            authcid: authcid.into(),
            secret: secret.into(),
        }
    }
}

impl Command for AuthenticateCommand {
    type Protocol = Imap;
    type Output = ();
    type Handler = CompletionHandler;

    fn name(&self) -> &'static str {
        "AUTHENTICATE"
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.authcid.is_empty() {
            return Err(CommandError::invalid("Authentication identity cannot be empty"));
        }
        Ok(())
    }

    fn encode(&self, tag: Option<&Tag>) -> WireRequest {
        let ir = initial_response_base64(self.mechanism, &self.authcid, &self.secret);
        tagged(tag, &format!("AUTHENTICATE {} {}", self.mechanism.name(), ir)).sensitive()
    }

    fn handler(&self, tag: Option<Tag>, promise: Promise<()>) -> CompletionHandler {
        CompletionHandler::new(tag, promise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire<C: Command>(c: &C) -> String {
        String::from_utf8(c.encode(Some(&Tag::new("A0001"))).as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn empty_mailbox_names_are_rejected() {
        assert!(matches!(
            CreateCommand::new("").validate(),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(DeleteCommand::new("").validate().is_err());
        assert!(SelectMailboxCommand::new("").validate().is_err());
        assert!(ExamineMailboxCommand::new("").validate().is_err());
        assert!(RenameCommand::new("a", "").validate().is_err());
        assert!(SelectMailboxCommand::new("INBOX\r\nA0002 LOGOUT").validate().is_err());
    }

    #[test]
    fn commands_without_fields_always_validate() {
        assert!(UnselectCommand.validate().is_ok());
        assert!(CloseCommand.validate().is_ok());
        assert!(NoopCommand.validate().is_ok());
        assert!(LogoutCommand.validate().is_ok());
        assert!(CapabilityCommand.validate().is_ok());
    }

    #[test]
    fn encodings_carry_the_tag() {
        assert_eq!(wire(&SelectMailboxCommand::new("INBOX")), "A0001 SELECT \"INBOX\"\r\n");
        assert_eq!(wire(&CreateCommand::new("Work/2024")), "A0001 CREATE \"Work/2024\"\r\n");
        assert_eq!(wire(&UnselectCommand), "A0001 UNSELECT\r\n");
        assert_eq!(wire(&RenameCommand::new("a", "b")), "A0001 RENAME \"a\" \"b\"\r\n");
        assert_eq!(wire(&ListCommand::default()), "A0001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote_string(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn credentials_are_redacted_in_logs() {
        let login = LoginCommand::new("joe", "hunter2");
        let request = login.encode(Some(&Tag::new("A0001")));
        assert!(request.is_sensitive());
        assert!(!format!("{:?}", request).contains("hunter2"));
        assert!(!format!("{:?}", login).contains("hunter2"));
        assert_eq!(
            wire(&AuthenticateCommand::new(SaslMechanism::Plain, "tim", "tanstaaftanstaaf")),
            "A0001 AUTHENTICATE PLAIN AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n"
        );
    }
}
