//! IMAP connection configuration

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::str::FromStr;

/// How the TCP connection to the server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Unencrypted TCP.
    Plain,
    /// Plain TCP upgraded with the `STARTTLS` command.
    StartTls,
    /// TLS from the first byte (usually port 993).
    Tls,
}

impl Transport {
    /// The conventional port for this transport.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => 993,
            Self::Plain | Self::StartTls => 143,
        }
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            other => Err(Error::Config(format!("Unknown transport: {other}"))),
        }
    }
}

/// Whether the server implements the MOVE extension (RFC 6851).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSupport {
    /// Always issue `UID MOVE`.
    Native,
    /// Always use COPY, STORE `\Deleted`, EXPUNGE.
    Fallback,
    /// Ask the server with `CAPABILITY` while connecting.
    Detect,
}

impl FromStr for MoveSupport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "true" | "yes" => Ok(Self::Native),
            "fallback" | "false" | "no" => Ok(Self::Fallback),
            "auto" | "detect" => Ok(Self::Detect),
            other => Err(Error::Config(format!("Unknown move support: {other}"))),
        }
    }
}

/// Everything a session needs to reach and open one folder.
///
/// Immutable for the lifetime of a session.
#[derive(Clone)]
pub struct MailboxConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Folder selected on connect; uploads land here and moves start
    /// from here.
    pub folder: String,
    pub move_support: MoveSupport,
    /// Skip certificate verification (self-signed local bridges).
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("transport", &self.transport)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("folder", &self.folder)
            .field("move_support", &self.move_support)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl MailboxConfig {
    /// Check the invariants a session relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host, credentials or folder
    /// name is empty.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
            ("folder", &self.folder),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_TRANSPORT` (default: `tls`)
    /// - `IMAP_HOST` (default: `127.0.0.1`)
    /// - `IMAP_PORT` (default: 993 for `tls`, 143 otherwise)
    /// - `IMAP_FOLDER` (default: `INBOX`)
    /// - `IMAP_MOVE` (default: `auto`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`MailboxConfig::from_env`].
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let transport = lookup("IMAP_TRANSPORT")
            .map_or(Ok(Transport::Tls), |v| v.parse())?;

        let port = match lookup("IMAP_PORT") {
            Some(v) => v
                .parse()
                .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?,
            None => transport.default_port(),
        };

        let accept_invalid_certs = match lookup("IMAP_ACCEPT_INVALID_CERTS") {
            Some(v) => v.parse().map_err(|e| {
                Error::Config(format!("Invalid IMAP_ACCEPT_INVALID_CERTS: {e}"))
            })?,
            None => false,
        };

        let config = Self {
            transport,
            host: lookup("IMAP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            username: lookup("IMAP_USERNAME")
                .ok_or_else(|| Error::Config("IMAP_USERNAME not set".into()))?,
            password: lookup("IMAP_PASSWORD")
                .ok_or_else(|| Error::Config("IMAP_PASSWORD not set".into()))?,
            folder: lookup("IMAP_FOLDER").unwrap_or_else(|| "INBOX".to_string()),
            move_support: lookup("IMAP_MOVE").map_or(Ok(MoveSupport::Detect), |v| v.parse())?,
            accept_invalid_certs,
        };
        config.validate()?;
        Ok(config)
    }
}
