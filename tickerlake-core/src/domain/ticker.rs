//! Ticker symbol normalization.
//!
//! Every key in the system uses the uppercase, whitespace-trimmed form of a
//! symbol. Anything that accepts a ticker from outside (payloads, config,
//! store reads) goes through [`normalize_ticker`] first.

/// Returns the canonical form of `raw`, or `None` when nothing is left after trimming.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Like [`normalize_ticker`], but keeps an empty string for empty input.
///
/// Store reads use this so that a blank lookup simply matches nothing.
pub fn canonical_or_empty(raw: &str) -> String {
    normalize_ticker(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_uppercases() {
        assert_eq!(normalize_ticker("  aapl \n").as_deref(), Some("AAPL"));
        assert_eq!(normalize_ticker("brk.b").as_deref(), Some("BRK.B"));
    }

    #[test]
    fn blank_is_rejected() {
        assert_eq!(normalize_ticker("   "), None);
        assert_eq!(normalize_ticker(""), None);
        assert_eq!(canonical_or_empty(" "), "");
    }
}
