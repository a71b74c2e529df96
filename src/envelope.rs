//! Envelope sender and recipients from trace headers
//!
//! The visible `From`/`To` headers say nothing reliable about delivery.
//! The envelope is recovered from `Return-Path` and from the `Received`
//! lines that each relay prepends.

use email_address::EmailAddress;
use mailparse::{MailHeader, MailHeaderMap};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Internal routing address; mail "for" it is a delivery loop, not a
/// real recipient.
pub const LOOP_SENTINEL_ADDRESS: &str = "somespecial@myownproject.com";

static RECEIVED_FOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^.*for <?(?P<recipient>.*?)>?;.*$").expect("received-for regex")
});

static ENVELOPE_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*envelope-from <(.*?)>.*").expect("envelope-from regex"));

/// Addresses the message was actually delivered to.
///
/// Collected from the `for <address>` clause of every `Received`
/// header. The loop sentinel and syntactically invalid candidates are
/// dropped.
#[must_use]
pub fn recipients(headers: &[MailHeader<'_>]) -> BTreeSet<String> {
    headers
        .get_all_values("Received")
        .iter()
        .filter(|value| value.contains("for "))
        .filter_map(|value| {
            let unfolded = strip_line_breaks(value);
            RECEIVED_FOR
                .captures(&unfolded)
                .and_then(|caps| caps.name("recipient"))
                .map(|m| m.as_str().to_string())
        })
        .filter(|candidate| is_allowed_recipient(candidate) && is_valid_address(candidate))
        .collect()
}

/// The envelope sender, or an empty string when none can be found.
///
/// `Return-Path` wins when it is a valid address as written. Its angle
/// brackets are not stripped, so `<a@b.c>` is rejected here and the
/// `Received` headers are consulted instead, in header order.
#[must_use]
pub fn sender(headers: &[MailHeader<'_>]) -> String {
    if let Some(return_path) = headers.get_first_value("Return-Path")
        && is_valid_address(&return_path)
    {
        return return_path;
    }

    headers
        .get_all_values("Received")
        .iter()
        .filter(|value| value.contains("envelope-from"))
        .find_map(|value| {
            let unfolded = strip_line_breaks(value);
            ENVELOPE_FROM
                .captures(&unfolded)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|address| is_valid_address(address))
        })
        .unwrap_or_default()
}

fn strip_line_breaks(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

fn is_allowed_recipient(address: &str) -> bool {
    !address.eq_ignore_ascii_case(LOOP_SENTINEL_ADDRESS)
}

/// A bare `local@domain` address. Display names and angle brackets
/// are not accepted.
fn is_valid_address(address: &str) -> bool {
    !address.contains(['<', '>', ' ']) && EmailAddress::is_valid(address)
}
