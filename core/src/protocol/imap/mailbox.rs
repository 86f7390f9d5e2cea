/*
 * mailbox.rs
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

//! Mailbox state reported by SELECT / EXAMINE.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages (`* n EXISTS`).
    pub exists: u32,
    /// `* n RECENT` (IMAP4rev1 only).
    pub recent: u32,
    /// Flags defined in the mailbox (`* FLAGS (...)`).
    pub flags: Vec<String>,
    /// Flags the client can change permanently (`[PERMANENTFLAGS (...)]`).
    pub permanent_flags: Vec<String>,
    pub uid_validity: Option<u32>,
    pub uid_next: Option<u32>,
    /// Sequence number of the first unseen message (`[UNSEEN n]`).
    pub first_unseen: Option<u32>,
    /// `[READ-ONLY]` on the tagged OK (always for EXAMINE).
    pub read_only: bool,
}
