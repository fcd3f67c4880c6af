//! Masking of secrets echoed back to operators.

const MASK: &str = "****";
const VISIBLE_TAIL: usize = 4;

/// Mask an API key for display.
///
/// Keys of up to four characters collapse to `****`; longer keys keep their
/// last four characters behind at most four asterisks. An empty key stays
/// empty so "not configured" remains distinguishable.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len == 0 {
        return String::new();
    }
    if len <= VISIBLE_TAIL {
        return MASK.to_string();
    }
    let hidden = len - VISIBLE_TAIL;
    let tail: String = secret.chars().skip(hidden).collect();
    format!("{}{tail}", "*".repeat(hidden.min(MASK.len())))
}

/// Whether a submitted key is a masked value (or nothing at all) rather than
/// a new secret. Such values must never overwrite the stored key.
pub fn is_masked_or_empty(candidate: &str, stored: &str) -> bool {
    candidate.is_empty() || candidate.starts_with(MASK) || candidate == mask_secret(stored)
}
