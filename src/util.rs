//! Small string helpers shared by the generator and the bootstrap builder.
//!
//! IMPORTANT:
//! - Everything here is a pure function of its arguments.
//! - No clocks, no randomness, no environment lookups.

use crate::schema::{INSTANCE_NAME_PREFIX, LOGICAL_ID_SUFFIX, ListingId};

/// Instance name of the collector for `listing_id`.
///
/// Examples:
/// - "1"   -> "MarketCollectorListingId1"
/// - "abc" -> "MarketCollectorListingIdabc"
pub fn instance_name(listing_id: &ListingId) -> String {
    format!("{INSTANCE_NAME_PREFIX}{listing_id}")
}

/// Construct id the provisioner registers the instance under.
pub fn logical_id(listing_id: &ListingId) -> String {
    format!("{}{LOGICAL_ID_SUFFIX}", instance_name(listing_id))
}

/// Wraps `value` in double quotes for a POSIX shell.
///
/// `\`, `"`, `$` and backticks are escaped so the value reaches
/// the process verbatim.
pub fn shell_double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Registry host part of an image reference.
///
/// The first path segment is a host only when it contains `.` or `:`
/// or is `localhost`; otherwise the reference is a Docker Hub name.
///
/// Examples:
/// - "123.dkr.ecr.us-east-1.amazonaws.com/repo:tag" -> Some("123.dkr.ecr.us-east-1.amazonaws.com")
/// - "localhost:5000/repo" -> Some("localhost:5000")
/// - "library/repo:tag" -> None
/// - "repo:tag" -> None
pub fn registry_host(image_reference: &str) -> Option<&str> {
    let (first, _) = image_reference.split_once('/')?;
    if first.contains(['.', ':']) || first == "localhost" {
        Some(first)
    } else {
        None
    }
}
