//! Reading typed responses up to a command's tagged completion
//!
//! The `fetch` and `search` streams of async-imap stop at the tagged
//! completion line without looking at its status, so a `NO` after some
//! data is indistinguishable from success. [`exchange`] reads the same
//! `imap-proto` responses itself and fails unless the completion is
//! `OK`. The helpers below pick the parts of a response this crate uses.

use crate::connection::ImapSession;
use async_imap::error::{Error as ImapError, Result as ImapResult};
use async_imap::imap_proto::{
    AttributeValue, MailboxDatum, MessageSection, Response, SectionPath, Status,
};

/// Send `command` and hand every response before its completion to
/// `on_data`.
///
/// Returns [`ImapError::No`] or [`ImapError::Bad`] when the server
/// rejects the command, after `on_data` has seen whatever data came
/// first.
pub async fn exchange<F>(
    session: &mut ImapSession,
    command: &str,
    mut on_data: F,
) -> ImapResult<()>
where
    F: FnMut(&Response<'_>),
{
    let id = session.run_command(command).await?;

    loop {
        let Some(response) = session.read_response().await? else {
            return Err(ImapError::ConnectionLost);
        };

        if let Response::Done {
            tag,
            status,
            information,
            ..
        } = response.parsed()
            && *tag == id
        {
            let information = information.as_deref().unwrap_or_default().to_string();
            return match status {
                Status::Ok => Ok(()),
                Status::Bad => Err(ImapError::Bad(information)),
                _ => Err(ImapError::No(information)),
            };
        }

        on_data(response.parsed());
    }
}

/// Sequence numbers carried by a `* SEARCH` line.
#[must_use]
pub fn search_hits<'r>(response: &'r Response<'_>) -> &'r [u32] {
    match response {
        Response::MailboxData(MailboxDatum::Search(ids)) => ids,
        _ => &[],
    }
}

/// The data items of a `* n FETCH (...)` line.
#[must_use]
pub fn fetch_attributes<'r, 'a>(response: &'r Response<'a>) -> Option<&'r [AttributeValue<'a>]> {
    match response {
        Response::Fetch(_, attrs) => Some(attrs),
        _ => None,
    }
}

/// Header fields from `BODY[HEADER]`, `BODY[HEADER.FIELDS (...)]` or
/// `RFC822.HEADER`.
#[must_use]
pub fn header_section<'r>(attrs: &'r [AttributeValue<'_>]) -> Option<&'r [u8]> {
    attrs.iter().find_map(|attr| match attr {
        AttributeValue::BodySection {
            section: Some(SectionPath::Full(MessageSection::Header)),
            data: Some(data),
            ..
        }
        | AttributeValue::Rfc822Header(Some(data)) => Some(data.as_ref()),
        _ => None,
    })
}

/// The whole message from `BODY[]` or `RFC822`.
#[must_use]
pub fn full_body<'r>(attrs: &'r [AttributeValue<'_>]) -> Option<&'r [u8]> {
    attrs.iter().find_map(|attr| match attr {
        AttributeValue::BodySection {
            section: None,
            data: Some(data),
            ..
        }
        | AttributeValue::Rfc822(Some(data)) => Some(data.as_ref()),
        _ => None,
    })
}

/// Message bytes as text. Invalid UTF-8 sequences are dropped.
#[must_use]
pub fn text(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
