//! SEARCH command handler.
//!
//! Matches emails against parsed `SearchKey` criteria from imap-types
//! and answers with **sequence numbers** (or UIDs for `UID SEARCH`).
//! We support:
//!
//! - `All`
//! - `Deleted` / `Undeleted` -- `\Deleted` flag filtering
//! - `And`, `Or`, `Not` -- logical combinators
//!
//! Other keys match every message. The response format (RFC 3501
//! Section 7.2.5):
//!
//! ```text
//! * SEARCH 1 2 3
//! A0003 OK SEARCH completed
//! ```
//!
//! A rejecting server sends the same `* SEARCH` line, then a tagged NO.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle SEARCH and UID SEARCH in the selected folder.
pub async fn handle_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    uid: bool,
    reject: bool,
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let hits: Vec<String> = folder
        .emails
        .iter()
        .enumerate()
        .filter(|(_, e)| criteria.iter().all(|key| matches_key(e, key)))
        .map(|(idx, e)| if uid { e.uid as usize } else { idx + 1 })
        .map(|n| n.to_string())
        .collect();

    // An empty result is still a "* SEARCH" line.
    let search_line = if hits.is_empty() {
        "* SEARCH\r\n".to_string()
    } else {
        format!("* SEARCH {}\r\n", hits.join(" "))
    };
    let _ = write_line(stream, &search_line).await;
    let resp = if reject {
        format!("{tag} NO [SERVERBUG] SEARCH failed\r\n")
    } else {
        format!("{tag} OK SEARCH completed\r\n")
    };
    let _ = write_line(stream, &resp).await;
}

/// Check if a test email matches a single `SearchKey`.
fn matches_key(email: &TestEmail, key: &SearchKey<'_>) -> bool {
    match key {
        SearchKey::Deleted => email.deleted,
        SearchKey::Undeleted => !email.deleted,
        SearchKey::And(keys) => keys.as_ref().iter().all(|k| matches_key(email, k)),
        SearchKey::Or(a, b) => matches_key(email, a) || matches_key(email, b),
        SearchKey::Not(k) => !matches_key(email, k),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    async fn run(criteria: &[SearchKey<'_>], uid: bool, mailbox: &Mailbox) -> String {
        run_with(criteria, uid, false, mailbox).await
    }

    async fn run_with(
        criteria: &[SearchKey<'_>],
        uid: bool,
        reject: bool,
        mailbox: &Mailbox,
    ) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_search("A1", criteria, uid, reject, mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(10, b"Subject: a\r\n\r\n")
            .deleted_email(20, b"Subject: b\r\n\r\n")
            .email(30, b"Subject: c\r\n\r\n")
            .build()
    }

    #[tokio::test]
    async fn undeleted_returns_sequence_numbers() {
        let output = run(&[SearchKey::Undeleted], false, &mailbox()).await;
        assert!(output.starts_with("* SEARCH 1 3\r\n"));
        assert!(output.contains("A1 OK SEARCH completed"));
    }

    #[tokio::test]
    async fn uid_search_returns_uids() {
        let output = run(&[SearchKey::Undeleted], true, &mailbox()).await;
        assert!(output.starts_with("* SEARCH 10 30\r\n"));
    }

    #[tokio::test]
    async fn empty_result_is_bare_search_line() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(&[SearchKey::All], false, &mailbox).await;
        assert!(output.starts_with("* SEARCH\r\n"));
    }

    #[tokio::test]
    async fn rejected_search_sends_hits_then_no() {
        let output = run_with(&[SearchKey::Undeleted], false, true, &mailbox()).await;
        assert_eq!(output, "* SEARCH 1 3\r\nA1 NO [SERVERBUG] SEARCH failed\r\n");
    }
}
