use std::sync::OnceLock;

use palisade_core::FingerprintStatus;
use regex::Regex;

/// Shape of a collector fingerprint: the absolute value of a 32-bit hash
/// rendered in radix 36, so at most 7 lowercase alphanumerics.
fn fingerprint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-z]{1,7}$").expect("static regex"))
}

/// Classify the transported fingerprint field. The hash is never scored;
/// it is validated here and surfaced for out-of-band correlation (many
/// usernames sharing one device, device churn per address).
pub fn validate(fingerprint: Option<&str>) -> FingerprintStatus {
    match fingerprint {
        None => FingerprintStatus::Missing,
        Some(fp) if fp.trim().is_empty() => FingerprintStatus::Missing,
        Some(fp) if fingerprint_re().is_match(fp.trim()) => FingerprintStatus::Present,
        Some(_) => FingerprintStatus::Malformed,
    }
}

/// Canonical definition of the collector's fingerprint hash. The injected
/// script mirrors this exactly: a 32-bit signed accumulator over UTF-16
/// code units, `h = h*31 + code` with wrapping, absolute value, radix 36.
/// Total for every input; identical component strings hash identically
/// across runs and platforms.
pub fn rolling_hash(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    to_radix36(hash.unsigned_abs())
}

fn to_radix36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("radix-36 digits are ascii")
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENTS: &str = "1920x1080x24|-60|Mozilla/5.0 (X11; Linux x86_64)|Linux x86_64|8|en-US|canvas:a91f|ANGLE (NVIDIA)|Arial,Helvetica";

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(rolling_hash(COMPONENTS), rolling_hash(COMPONENTS));
    }

    #[test]
    fn single_component_change_changes_hash() {
        let altered = COMPONENTS.replace("1920x1080", "1366x768");
        assert_ne!(rolling_hash(COMPONENTS), rolling_hash(&altered));
    }

    #[test]
    fn hash_is_total_over_odd_input() {
        // Sentinel substitution upstream means input is always a string,
        // but any string must hash without panicking.
        assert_eq!(rolling_hash(""), "0");
        rolling_hash("unavailable|unavailable|unavailable");
        rolling_hash("日本語|emoji 🦀|null");
    }

    #[test]
    fn hash_output_is_valid_fingerprint() {
        let fp = rolling_hash(COMPONENTS);
        assert_eq!(validate(Some(&fp)), FingerprintStatus::Present);
        assert!(fp.len() <= 7);
    }

    #[test]
    fn validate_classifies_shapes() {
        assert_eq!(validate(None), FingerprintStatus::Missing);
        assert_eq!(validate(Some("")), FingerprintStatus::Missing);
        assert_eq!(validate(Some("   ")), FingerprintStatus::Missing);
        assert_eq!(validate(Some("1uw9zpc")), FingerprintStatus::Present);
        assert_eq!(validate(Some("ABC!")), FingerprintStatus::Malformed);
        assert_eq!(validate(Some("longerthanseven")), FingerprintStatus::Malformed);
    }

    #[test]
    fn radix36_matches_js_to_string() {
        // Cross-checked against Number.prototype.toString(36).
        assert_eq!(to_radix36(35), "z");
        assert_eq!(to_radix36(36), "10");
        assert_eq!(to_radix36(46_655), "zzz");
        assert_eq!(to_radix36(u32::MAX), "1z141z3");
    }
}
