//! Supplier invoice normalization
//!
//! Invoice numbers arrive from suppliers in every imaginable shape
//! ("inv-7", "INV 0007", "42", "A-99"). The normalized form is used as the
//! lot-matching key for merge-on-approve, so the rules here must stay
//! stable: changing them changes which lots merge.

/// Canonical form: `{PREFIX}-{digits zero-padded to 6}`.
///
/// - `prefix?-?digits` keeps the prefix (default `INV`): `"inv-7"` -> `"INV-000007"`
/// - all digits gets the `INV` prefix: `"42"` -> `"INV-000042"`
/// - anything else is stripped to `[A-Z0-9-]`
pub fn normalize_invoice(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return String::new();
    }

    // All digits: pad and prefix
    if cleaned.chars().all(|c| c.is_ascii_digit()) {
        return format!("INV-{:0>6}", cleaned);
    }

    // Optional alphabetic prefix, optional dash, then digits
    if let Some((prefix, digits)) = split_prefixed(&cleaned) {
        let prefix = if prefix.is_empty() { "INV" } else { prefix };
        return format!("{}-{:0>6}", prefix, digits);
    }

    // Fallback: keep only the characters the matching key understands
    cleaned
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Split `PREFIX-123` / `PREFIX123` into prefix and digit run. Returns `None`
/// unless the whole string is consumed by the pattern.
fn split_prefixed(s: &str) -> Option<(&str, &str)> {
    let digit_start = s.find(|c: char| c.is_ascii_digit())?;
    let (head, digits) = s.split_at(digit_start);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let prefix = head.strip_suffix('-').unwrap_or(head);
    if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((prefix, digits))
}

/// Match a stored lot invoice (raw + normalized key) against a query.
///
/// Legacy rows predate normalization, so both sides are compared in both
/// forms.
pub fn invoice_matches(stored_raw: &str, stored_key: &str, query: &str) -> bool {
    if query.trim().is_empty() {
        return false;
    }
    if stored_raw == query || stored_key == query {
        return true;
    }
    // A query that normalizes to nothing (e.g. "###") must not match lots
    // stored with a blank key.
    let query_key = normalize_invoice(query);
    !query_key.is_empty() && (stored_key == query_key || stored_raw == query_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_invoice_padded() {
        assert_eq!(normalize_invoice("42"), "INV-000042");
        assert_eq!(normalize_invoice("000042"), "INV-000042");
        assert_eq!(normalize_invoice("1234567"), "INV-1234567");
    }

    #[test]
    fn test_prefixed_invoice() {
        assert_eq!(normalize_invoice("inv-7"), "INV-000007");
        assert_eq!(normalize_invoice("INV7"), "INV-000007");
        assert_eq!(normalize_invoice("po-99"), "PO-000099");
        assert_eq!(normalize_invoice("ABC123"), "ABC-000123");
    }

    #[test]
    fn test_whitespace_and_case() {
        assert_eq!(normalize_invoice("  inv - 7 "), "INV-000007");
        assert_eq!(normalize_invoice("Inv 0042"), "INV-000042");
    }

    #[test]
    fn test_fallback_strips_to_safe_chars() {
        assert_eq!(normalize_invoice("A1-B2#x"), "A1-B2X");
        assert_eq!(normalize_invoice("12-34"), "12-34");
    }

    #[test]
    fn test_empty_invoice() {
        assert_eq!(normalize_invoice(""), "");
        assert_eq!(normalize_invoice("   "), "");
    }

    #[test]
    fn test_matches_raw_and_normalized() {
        let raw = "inv-7";
        let key = normalize_invoice(raw);
        assert!(invoice_matches(raw, &key, "inv-7"));
        assert!(invoice_matches(raw, &key, "INV-000007"));
        assert!(invoice_matches(raw, &key, "INV7"));
        assert!(!invoice_matches(raw, &key, "INV-000008"));
        assert!(!invoice_matches(raw, &key, ""));
    }

    /// A query made only of stripped characters normalizes to "", which must
    /// not pair up with lots stored under a blank invoice.
    #[test]
    fn test_unnormalizable_query_matches_nothing() {
        assert!(!invoice_matches("", "", "###"));
        assert!(!invoice_matches("", "", "!!"));
        // An exact raw match still wins even when the key is blank
        assert!(invoice_matches("###", "", "###"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in ["inv-7", "42", "A1-B2#x", "PO 123"] {
            let once = normalize_invoice(raw);
            assert_eq!(normalize_invoice(&once), once);
        }
    }
}
