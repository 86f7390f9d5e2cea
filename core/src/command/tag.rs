/*
 * tag.rs
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

//! Per-connection tag allocation for tagged (IMAP) commands.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Client-chosen command tag, echoed by the server's terminal response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Strictly increasing counter formatted as A0001, A0002, ... Unique for the life of one
/// connection; a reconnect starts a new allocator.
#[derive(Debug)]
pub struct TagAllocator {
    next: AtomicU32,
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }
}

impl TagAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Tag {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Tag(format!("A{:04}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tags_are_sequential() {
        let tags = TagAllocator::new();
        assert_eq!(tags.next().as_str(), "A0001");
        assert_eq!(tags.next().as_str(), "A0002");
    }

    #[test]
    fn tags_never_repeat() {
        let tags = TagAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..20_000 {
            assert!(seen.insert(tags.next()));
        }
    }

    #[test]
    fn allocators_are_independent() {
        let a = TagAllocator::new();
        let b = TagAllocator::new();
        a.next();
        assert_eq!(b.next(), "A0001");
    }
}
