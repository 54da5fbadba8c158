// src/fetch/scrape.rs

//! Recover a hash mismatch from fetch tool output

use super::HashMismatch;
use regex::Regex;
use std::sync::LazyLock;

/// `specified:`/`wanted:` line following a mismatch header
static SPECIFIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:specified|wanted):\s*(\S+)\s*$").unwrap());

/// `got:` line following a mismatch header
static GOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*got:\s*(\S+)\s*$").unwrap());

/// Single-line form used by older tools
static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"output path '[^']*' has (?:r:)?[a-z0-9]+ hash '([^']+)' when '([^']+)' was expected")
        .unwrap()
});

/// Find the first hash mismatch reported in a fetch log
///
/// Recognized phrasings:
///
/// ```text
/// error: hash mismatch in fixed-output derivation '/nix/store/...-hello-2.12.2.tar.gz.drv':
///          specified: sha256-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=
///             got:    sha256-WpqZbcKSzCTc9BHO6H6S9qrluNE72caBm0x6nc4IGKs=
///
/// output path '/nix/store/...' has r:sha256 hash '1ab...' when '000...' was expected
/// ```
pub fn scrape_mismatch(log: &str) -> Option<HashMismatch> {
    if let Some(header) = log.find("hash mismatch") {
        let rest = &log[header..];
        if let Some(got) = GOT_RE.captures(rest) {
            let expected = SPECIFIED_RE
                .captures(rest)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            return Some(HashMismatch {
                expected,
                got: got[1].to_string(),
            });
        }
    }

    LEGACY_RE.captures(log).map(|c| HashMismatch {
        expected: c[2].to_string(),
        got: c[1].to_string(),
    })
}
