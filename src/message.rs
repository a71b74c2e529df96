//! Message records built from raw FETCH payloads

use crate::date;
use crate::envelope;
use crate::uid::Uid;
use chrono::{DateTime, FixedOffset};
use mailparse::{MailHeader, MailHeaderMap};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Header fields copied verbatim, as (source field, map key).
///
/// `date` is overwritten afterwards with the normalized value.
const COPIED_HEADERS: &[(&str, &str)] = &[
    ("Subject", "subject"),
    ("Date", "date"),
    ("CES-imde", "ces-imde"),
    ("Reply-To", "reply-to"),
    ("Cc", "cc"),
];

/// A value in [`Message::header`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Text(String),
    Addresses(BTreeSet<String>),
}

impl HeaderValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Addresses(_) => None,
        }
    }
}

/// One message as returned by a fetch.
///
/// `header` always holds `subject`, `date` (RFC 3339), `rcpt_to` and
/// `return_path`. Attachments and body content are not extracted yet
/// and stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub uid: Uid,
    pub raw: String,
    pub header: BTreeMap<String, HeaderValue>,
    pub attachments: Vec<String>,
    pub content: String,
    /// True when `raw` holds only the fetched header fields.
    pub header_only: bool,
    /// Normalized date, used for ordering. Serialized through
    /// `header["date"]` only.
    #[serde(skip)]
    pub date: DateTime<FixedOffset>,
}

impl Message {
    /// Build a message from the raw RFC 2822 text of a FETCH.
    ///
    /// `header_only` marks payloads that carry no body (the inbox
    /// scan fetches only selected header fields). Headers that fail to
    /// parse leave the record with defaults instead of failing.
    #[must_use]
    pub fn build(uid: Uid, raw: String, header_only: bool) -> Self {
        let parsed = match mailparse::parse_headers(raw.as_bytes()) {
            Ok((headers, _)) => headers,
            Err(e) => {
                tracing::debug!("Headers of UID {} did not parse: {}", uid, e);
                Vec::new()
            }
        };
        let (header, date) = header_fields(&parsed);

        // Bodies and attachments are not extracted; `raw` carries them.
        Self {
            uid,
            header,
            date,
            attachments: Vec::new(),
            content: String::new(),
            header_only,
            raw,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        self.text("subject").unwrap_or_default()
    }

    #[must_use]
    pub fn return_path(&self) -> &str {
        self.text("return_path").unwrap_or_default()
    }

    /// Envelope recipients, sorted.
    #[must_use]
    pub fn recipients(&self) -> Vec<&str> {
        match self.header.get("rcpt_to") {
            Some(HeaderValue::Addresses(set)) => set.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// A copied or computed header by map key.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.header.get(key).and_then(HeaderValue::as_text)
    }
}

fn header_fields(
    headers: &[MailHeader<'_>],
) -> (BTreeMap<String, HeaderValue>, DateTime<FixedOffset>) {
    let mut fields = BTreeMap::new();
    for (source, key) in COPIED_HEADERS {
        if let Some(value) = headers.get_first_value(source) {
            fields.insert((*key).to_string(), HeaderValue::Text(value));
        }
    }
    fields
        .entry("subject".to_string())
        .or_insert_with(|| HeaderValue::Text(String::new()));

    let date = date::parse_or_now(headers.get_first_value("Date").as_deref());
    fields.insert("date".to_string(), HeaderValue::Text(date.to_rfc3339()));

    fields.insert(
        "rcpt_to".to_string(),
        HeaderValue::Addresses(envelope::recipients(headers)),
    );
    fields.insert(
        "return_path".to_string(),
        HeaderValue::Text(envelope::sender(headers)),
    );

    (fields, date)
}
