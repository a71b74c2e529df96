//! Persistent message identifiers
//!
//! A [`Uid`] is the server-assigned identifier that stays valid across
//! sessions, unlike the sequence numbers returned by SEARCH. It is kept
//! as an opaque digit string.

use crate::error::{Error, Result};
use async_imap::imap_proto::AttributeValue;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A message UID: a non-empty run of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Pull the UID out of the data items of one FETCH response.
    ///
    /// ```
    /// use async_imap::imap_proto::{Response, parser::parse_response};
    /// use mailbox_client::Uid;
    ///
    /// let (_, response) = parse_response(b"* 1 FETCH (FLAGS (\\Seen) UID 2040)\r\n").unwrap();
    /// let Response::Fetch(_, attrs) = response else { unreachable!() };
    /// assert_eq!(Uid::extract(&attrs).unwrap().as_str(), "2040");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the items carry no `UID`.
    pub fn extract(attrs: &[AttributeValue<'_>]) -> Result<Self> {
        attrs
            .iter()
            .find_map(|attr| match attr {
                AttributeValue::Uid(uid) => Some(Self::from(*uid)),
                _ => None,
            })
            .ok_or_else(|| {
                Error::Parse(format!(
                    "UID of the mail cannot be parsed from the value: {attrs:?}"
                ))
            })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::Parse(format!("Invalid UID: {s:?}")))
        }
    }
}

impl From<u32> for Uid {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
