//! IMAP mailbox client library
//!
//! Manages one IMAP connection to one folder and turns FETCH responses
//! into [`Message`] records. Moves use the `MOVE` extension when the
//! server has it and fall back to copy, flag and expunge when it does
//! not.
//!
//! Sessions are opened with [`MailboxSession::open`] and given back
//! with [`MailboxSession::release`], or scoped with [`with_session`].

mod config;
mod connection;
mod date;
mod envelope;
mod error;
mod message;
mod response;
mod session;
mod uid;

pub use config::{MailboxConfig, MoveSupport, Transport};
pub use envelope::LOOP_SENTINEL_ADDRESS;
pub use error::{Error, Result};
pub use message::{HeaderValue, Message};
pub use session::{CONNECT_TIMEOUT, MailboxSession, MoveStrategy, with_session};
pub use uid::Uid;
