//! Candidate extraction from scraped source text

use once_cell::sync::Lazy;
use regex::Regex;

/// First octet of an IPv4 address, 1-255.
const FIRST_OCTET: &str = r"(?:[1-9]|[1-9]\d|1\d{2}|2[0-4]\d|25[0-5])";
/// Any other octet, 0-255.
const OCTET: &str = r"(?:\d|[1-9]\d|1\d{2}|2[0-4]\d|25[0-5])";
/// TCP port, 0-65535.
const PORT: &str = r"(?:\d|[1-9]\d{1,3}|[1-5]\d{4}|6[0-4]\d{3}|65[0-4]\d{2}|655[0-2]\d|6553[0-5])";

/// Matches `ip:port` bounded by non-digit, non-dot context on both sides.
///
/// The octet and port ranges are encoded as closed-form alternations instead
/// of being re-validated after the match, so digits adjacent to an
/// out-of-range number are never partially matched. Group 1 is the socket
/// address, group 2 the host.
static CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:^|[^\d.])(({FIRST_OCTET}\.{OCTET}\.{OCTET}\.{OCTET}):{PORT})(?:[^\d.]|$)"
    ))
    .expect("invalid candidate regex")
});

/// An `ip:port` pair found in source text, not yet validated against a
/// live check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'t> {
    pub socket_address: &'t str,
    pub ip: &'t str,
}

/// Lazily extract all proxy candidates from arbitrary text.
///
/// Pure and stateless; the returned iterator is finite for any input.
/// Successive candidates may share a single boundary character (for example
/// a newline between two addresses), so iteration resumes at the end of the
/// captured address rather than the end of the whole match.
pub fn extract_candidates(text: &str) -> impl Iterator<Item = Candidate<'_>> {
    let mut at = 0;
    std::iter::from_fn(move || {
        let captures = CANDIDATE_RE.captures_at(text, at)?;
        let socket_address = captures.get(1)?;
        let ip = captures.get(2)?;
        at = socket_address.end();
        Some(Candidate {
            socket_address: socket_address.as_str(),
            ip: ip.as_str(),
        })
    })
}
