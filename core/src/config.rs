/*
 * config.rs
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

//! Client configuration: per-protocol command timeouts, connect timeout and EHLO identity.
//! Loaded from a small XML file (~/.corriere/config.xml) with the quick_xml reader; a missing
//! element keeps its default.
//!
//! ```xml
//! <corriere>
//!   <imap timeout="30"/>
//!   <smtp timeout="300" ehlo="client.example.org"/>
//!   <connect timeout="30"/>
//! </corriere>
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ConfigError;

const DEFAULT_IMAP_TIMEOUT_SECS: u64 = 30;
/// RFC 5321 4.5.3.2 suggests minutes for most replies; the DATA terminator wait is 10 minutes.
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for an IMAP command without its own timeout.
    pub imap_timeout: Duration,
    /// Deadline for an SMTP command without its own timeout.
    pub smtp_timeout: Duration,
    /// Deadline for TCP connect, TLS handshake and the server greeting.
    pub connect_timeout: Duration,
    /// Domain sent in EHLO.
    pub ehlo_hostname: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            imap_timeout: Duration::from_secs(DEFAULT_IMAP_TIMEOUT_SECS),
            smtp_timeout: Duration::from_secs(DEFAULT_SMTP_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            ehlo_hostname: "localhost".to_string(),
        }
    }
}

/// Default config directory: ~/.corriere.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".corriere"))
}

/// Default config path: ~/.corriere/config.xml.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.xml"))
}

impl ClientConfig {
    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_xml(&content)
    }

    /// Parse an XML document. Unknown elements and attributes are ignored.
    pub fn from_xml(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => config.apply_element(&e)?,
                Ok(_) => {}
                Err(e) => return Err(ConfigError::Xml(e.to_string())),
            }
        }
        Ok(config)
    }

    fn apply_element(&mut self, e: &BytesStart<'_>) -> Result<(), ConfigError> {
        let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| ConfigError::Xml(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| ConfigError::Xml(err.to_string()))?
                .into_owned();
            match (element.as_str(), key.as_str()) {
                ("imap", "timeout") => self.imap_timeout = parse_timeout("imap.timeout", &value)?,
                ("smtp", "timeout") => self.smtp_timeout = parse_timeout("smtp.timeout", &value)?,
                ("connect", "timeout") => {
                    self.connect_timeout = parse_timeout("connect.timeout", &value)?
                }
                ("smtp", "ehlo") => {
                    let v = value.trim();
                    if v.is_empty() || v.contains(char::is_whitespace) {
                        return Err(ConfigError::InvalidValue {
                            name: "smtp.ehlo".to_string(),
                            value,
                        });
                    }
                    self.ehlo_hostname = v.to_string();
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Timeout in whole seconds; zero is rejected since it would fail every command.
fn parse_timeout(name: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = ClientConfig::from_xml("<corriere/>").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.imap_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_timeouts_and_ehlo() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <corriere>
              <imap timeout="45"/>
              <smtp timeout="120" ehlo="client.example.org"/>
              <connect timeout="10"></connect>
              <unknown flavour="ignored"/>
            </corriere>"#;
        let config = ClientConfig::from_xml(xml).unwrap();
        assert_eq!(config.imap_timeout, Duration::from_secs(45));
        assert_eq!(config.smtp_timeout, Duration::from_secs(120));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.ehlo_hostname, "client.example.org");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ClientConfig::from_xml(r#"<corriere><imap timeout="0"/></corriere>"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "imap.timeout"));
    }

    #[test]
    fn non_numeric_timeout_rejected() {
        let err = ClientConfig::from_xml(r#"<corriere><smtp timeout="soon"/></corriere>"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("corriere-config-does-not-exist.xml");
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
