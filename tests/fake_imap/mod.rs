//! Fake IMAP server for integration testing
//!
//! This module provides an in-process IMAP server that speaks enough
//! of the protocol to drive `MailboxSession` end-to-end:
//!
//! TCP -> greeting -> (STARTTLS -> TLS handshake) -> LOGIN -> commands -> LOGOUT
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, TLS setup, fault switches, and dispatch
//! - `handlers/` -- one file per IMAP command (SELECT, UID MOVE, etc.)
//! - `mailbox` -- test data model (folders, emails, builder)
//! - `io` -- command framing and write helpers


pub use mailbox::MailboxBuilder;
pub use server::FakeImapServer;
