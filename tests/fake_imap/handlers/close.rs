//! CLOSE command handler.
//!
//! Silently expunges `\Deleted` messages from the selected folder (no
//! untagged EXPUNGE lines, per RFC 3501 Section 6.4.2) and returns the
//! connection to the authenticated state.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the CLOSE command. Returns `true` if a folder was closed.
pub async fn handle_close<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    mailbox: &Mutex<Mailbox>,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) -> bool {
    let Some(folder_name) = selected_folder else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return false;
    };

    if let Some(folder) = mailbox.lock().unwrap().get_folder_mut(folder_name) {
        folder.expunge();
    }

    let resp = format!("{tag} OK CLOSE completed\r\n");
    let _ = write_line(stream, &resp).await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn expunges_silently() {
        let mb = Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .deleted_email(1, b"Subject: a\r\n\r\n")
                .email(2, b"Subject: b\r\n\r\n")
                .build(),
        );
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        assert!(handle_close("A1", &mb, Some("INBOX"), &mut stream).await);
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "A1 OK CLOSE completed\r\n");
        assert_eq!(mb.lock().unwrap().uids("INBOX"), vec![2]);
    }
}
