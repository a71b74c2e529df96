//! Error types for mailbox-client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Opening, authenticating or selecting failed while building a
    /// session. No session exists afterwards.
    #[error("IMAP connection error: {0}")]
    Connection(String),

    /// A mailbox operation was rejected or returned unusable data.
    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    /// A move copied the message but could not remove the original,
    /// so it now exists in both folders.
    #[error("Mailbox inconsistency: {0}")]
    Consistency(String),

    /// A single identifier or date could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for protocol failures, including the consistency
    /// sub-kind raised by the move fallback.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Consistency(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
