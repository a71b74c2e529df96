//! A selected IMAP folder and the operations on it
//!
//! A [`MailboxSession`] only exists once the connection is open,
//! authenticated and the configured folder is selected. Construction
//! either reaches that state or fails with [`Error::Connection`] and
//! leaves nothing behind.

use crate::config::{MailboxConfig, MoveSupport};
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::response::{self, exchange};
use crate::uid::Uid;
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for connect, login and select together. Operations on an
/// open session are not bounded.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const MARK_DELETED: &str = "+FLAGS (\\Deleted)";

/// How [`MailboxSession::move_mail`] moves a message. Fixed when the
/// session is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStrategy {
    /// One `UID MOVE` command (RFC 6851).
    Native,
    /// `UID COPY`, then `UID STORE +FLAGS (\Deleted)`, then `EXPUNGE`.
    CopyMarkExpunge,
}

pub struct MailboxSession {
    session: ImapSession,
    folder: String,
    strategy: MoveStrategy,
    released: bool,
}

impl MailboxSession {
    /// Connect, log in and select `config.folder`.
    ///
    /// The whole sequence runs under [`CONNECT_TIMEOUT`]. If selecting
    /// fails after login, the connection is logged out before the error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::Connection`] if any step fails or the timeout expires.
    pub async fn open(config: &MailboxConfig) -> Result<Self> {
        config.validate()?;

        let (session, strategy) = tokio::time::timeout(CONNECT_TIMEOUT, establish(config))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "Timed out after {}s opening {} on {}:{}",
                    CONNECT_TIMEOUT.as_secs(),
                    config.folder,
                    config.host,
                    config.port
                ))
            })??;

        info!("Selected {} using {:?} moves", config.folder, strategy);
        Ok(Self {
            session,
            folder: config.folder.clone(),
            strategy,
            released: false,
        })
    }

    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    #[must_use]
    pub const fn move_strategy(&self) -> MoveStrategy {
        self.strategy
    }

    /// Run `SEARCH` and return the matching sequence numbers.
    ///
    /// Sequence numbers are positions in the current folder, not UIDs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the criteria contain a line
    /// break, the server rejects the search, or the response cannot be
    /// read.
    pub async fn search(&mut self, criteria: &str) -> Result<Vec<String>> {
        if criteria.contains(['\r', '\n']) {
            return Err(Error::Protocol(format!(
                "Search criteria must be a single line: {criteria:?}"
            )));
        }

        let mut ids = Vec::new();
        exchange(&mut self.session, &format!("SEARCH {criteria}"), |response| {
            ids.extend(response::search_hits(response).iter().map(u32::to_string));
        })
        .await
        .map_err(|e| Error::Protocol(format!("SEARCH {criteria} failed: {e}")))?;
        Ok(ids)
    }

    /// Headers of every message not flagged `\Deleted`, newest first.
    ///
    /// Only UID, subject and date are fetched. A message whose UID
    /// cannot be read from the response is skipped with a warning.
    /// Messages with equal dates keep the server's order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the search or the fetch fails.
    pub async fn scan_inbox(&mut self) -> Result<Vec<Message>> {
        let ids = self.search("UNDELETED").await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let command = format!(
            "FETCH {} (UID BODY.PEEK[HEADER.FIELDS (SUBJECT DATE)])",
            ids.join(",")
        );
        let folder = &self.folder;
        let mut messages = Vec::with_capacity(ids.len());
        exchange(&mut self.session, &command, |response| {
            let Some(attrs) = response::fetch_attributes(response) else {
                return;
            };
            let Some(header) = response::header_section(attrs) else {
                debug!("Ignoring FETCH response without headers in {}", folder);
                return;
            };
            match Uid::extract(attrs) {
                Ok(uid) => messages.push(Message::build(uid, response::text(header), true)),
                Err(e) => warn!("Skipping message during scan of {}: {}", folder, e),
            }
        })
        .await
        .map_err(|e| Error::Protocol(format!("Cannot fetch headers in {}: {e}", self.folder)))?;

        messages.sort_by(|a, b| b.date.cmp(&a.date));
        debug!("Scanned {} messages in {}", messages.len(), self.folder);
        Ok(messages)
    }

    /// Fetch the complete message with the given UID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the fetch fails, the server sends
    /// no message data, or the message text is empty.
    pub async fn get_mail(&mut self, uid: &Uid) -> Result<Message> {
        let mut body = None;
        exchange(&mut self.session, &format!("UID FETCH {uid} (RFC822)"), |response| {
            if body.is_none() {
                body = response::fetch_attributes(response)
                    .and_then(response::full_body)
                    .map(response::text);
            }
        })
        .await
        .map_err(|e| Error::Protocol(format!("Cannot fetch mail with UID {uid}: {e}")))?;

        let text = body.ok_or_else(|| Error::Protocol(format!("No message data for UID {uid}")))?;
        if text.is_empty() {
            return Err(Error::Protocol(format!("Mail with UID {uid} is empty")));
        }
        Ok(Message::build(uid.clone(), text, false))
    }

    /// Append a raw RFC 2822 message to the session's folder.
    ///
    /// No flags are set, so the message arrives unseen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the server does not accept the
    /// message.
    pub async fn upload_mail(&mut self, raw: &[u8]) -> Result<()> {
        self.session
            .append(&self.folder, None, None, raw)
            .await
            .map_err(|e| Error::Protocol(format!("Cannot upload mail to {}: {e}", self.folder)))
    }

    /// Move a message to `destination`.
    ///
    /// With [`MoveStrategy::CopyMarkExpunge`] the original is only
    /// flagged after the copy succeeded. If flagging then fails the
    /// message exists in both folders; this is reported as
    /// [`Error::Consistency`] and the copy is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the move or copy is rejected and
    /// [`Error::Consistency`] if the original cannot be flagged.
    pub async fn move_mail(&mut self, uid: &Uid, destination: &str) -> Result<()> {
        let failed = |e: async_imap::error::Error| {
            Error::Protocol(format!(
                "Cannot move mail with UID {uid} to {destination}: {e}"
            ))
        };

        match self.strategy {
            MoveStrategy::Native => {
                self.session
                    .uid_mv(uid.as_str(), destination)
                    .await
                    .map_err(failed)?;
            }
            MoveStrategy::CopyMarkExpunge => {
                self.session
                    .uid_copy(uid.as_str(), destination)
                    .await
                    .map_err(failed)?;
                self.mark_deleted(uid).await.map_err(|e| {
                    Error::Consistency(format!(
                        "Mail with UID {uid} was copied to {destination} but could not be \
                         marked deleted in {}, it now exists in both folders: {e}",
                        self.folder
                    ))
                })?;
                self.expunge().await;
            }
        }

        debug!("Moved UID {} from {} to {}", uid, self.folder, destination);
        Ok(())
    }

    /// Flag a message `\Deleted` and expunge the folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the flag cannot be set. Nothing
    /// is expunged in that case.
    pub async fn delete_mail(&mut self, uid: &Uid) -> Result<()> {
        self.mark_deleted(uid).await.map_err(|e| {
            Error::Protocol(format!(
                "Cannot mark mail with UID {uid} deleted in {}: {e}",
                self.folder
            ))
        })?;
        self.expunge().await;
        Ok(())
    }

    /// Close the folder and log out.
    ///
    /// Both commands are sent even if the first one fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] with the first failure.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let closed = self.session.close().await;
        let logged_out = self.session.logout().await;

        closed.map_err(|e| Error::Protocol(format!("Cannot close {}: {e}", self.folder)))?;
        logged_out.map_err(|e| Error::Protocol(format!("Cannot log out: {e}")))?;
        debug!("Released session for {}", self.folder);
        Ok(())
    }

    async fn mark_deleted(&mut self, uid: &Uid) -> async_imap::error::Result<()> {
        self.session
            .run_command_and_check_ok(format!("UID STORE {uid} {MARK_DELETED}"))
            .await
    }

    /// Expunge failures are logged only: the flag is already set and
    /// the next expunge by any client removes the message.
    async fn expunge(&mut self) {
        if let Err(e) = self.session.run_command_and_check_ok("EXPUNGE").await {
            warn!("EXPUNGE in {} failed: {}", self.folder, e);
        }
    }
}

impl Drop for MailboxSession {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Session for {} dropped without release, closing the socket without LOGOUT",
                self.folder
            );
        }
    }
}

/// Open a session, run `operation` on it, and release it.
///
/// The session is released whether or not the operation succeeds. An
/// error from the operation is returned in preference to an error from
/// releasing.
///
/// ```no_run
/// # async fn demo(config: mailbox_client::MailboxConfig) -> mailbox_client::Result<()> {
/// let messages = mailbox_client::with_session(&config, |session| {
///     Box::pin(async move { session.scan_inbox().await })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the error from opening, from `operation`, or from release.
pub async fn with_session<T, F>(config: &MailboxConfig, operation: F) -> Result<T>
where
    F: for<'s> FnOnce(&'s mut MailboxSession) -> BoxFuture<'s, Result<T>>,
{
    let mut session = MailboxSession::open(config).await?;
    let outcome = operation(&mut session).await;
    let released = session.release().await;

    match outcome {
        Ok(value) => released.map(|()| value),
        Err(e) => {
            if let Err(release_error) = released {
                warn!("Release after failed operation also failed: {}", release_error);
            }
            Err(e)
        }
    }
}

async fn establish(config: &MailboxConfig) -> Result<(ImapSession, MoveStrategy)> {
    let mut session = connection::connect(config).await?;

    let prepared = async {
        let strategy = move_strategy(&mut session, config.move_support).await?;
        session
            .select(&config.folder)
            .await
            .map_err(|e| Error::Connection(format!("Cannot select {}: {e}", config.folder)))?;
        Ok(strategy)
    }
    .await;

    match prepared {
        Ok(strategy) => Ok((session, strategy)),
        Err(e) => {
            if let Err(logout_error) = session.logout().await {
                debug!("Logout after failed open: {}", logout_error);
            }
            Err(e)
        }
    }
}

async fn move_strategy(session: &mut ImapSession, support: MoveSupport) -> Result<MoveStrategy> {
    match support {
        MoveSupport::Native => Ok(MoveStrategy::Native),
        MoveSupport::Fallback => Ok(MoveStrategy::CopyMarkExpunge),
        MoveSupport::Detect => {
            let capabilities = session
                .capabilities()
                .await
                .map_err(|e| Error::Connection(format!("CAPABILITY failed: {e}")))?;
            let strategy = if capabilities.has_str("MOVE") {
                MoveStrategy::Native
            } else {
                MoveStrategy::CopyMarkExpunge
            };
            debug!("Server capabilities select {:?} moves", strategy);
            Ok(strategy)
        }
    }
}
