use chrono::{DateTime, Utc};
use rand::Rng;

const REFERENCE_PREFIX: &str = "QTE";
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;

/// `QTE-<yyyymmddHHMMSS>-<6 chars of A-Z0-9>`. Uniqueness within one second
/// rests on the random suffix.
pub fn generate_quote_reference() -> String {
    quote_reference_at(Utc::now(), &mut rand::thread_rng())
}

pub fn quote_reference_at<R: Rng + ?Sized>(at: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{REFERENCE_PREFIX}-{}-{suffix}", at.format("%Y%m%d%H%M%S"))
}

pub fn is_quote_reference(candidate: &str) -> bool {
    let mut parts = candidate.split('-');
    let (Some(prefix), Some(stamp), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    prefix == REFERENCE_PREFIX
        && stamp.len() == 14
        && stamp.bytes().all(|byte| byte.is_ascii_digit())
        && suffix.len() == SUFFIX_LEN
        && suffix.bytes().all(|byte| SUFFIX_ALPHABET.contains(&byte))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};
    use rand::{rngs::StdRng, SeedableRng};

    use super::{generate_quote_reference, is_quote_reference, quote_reference_at};

    #[test]
    fn reference_embeds_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("valid timestamp");
        let reference = quote_reference_at(at, &mut StdRng::seed_from_u64(7));

        assert!(reference.starts_with("QTE-20240309140507-"));
        assert!(is_quote_reference(&reference));
    }

    #[test]
    fn references_within_one_tick_are_distinct() {
        let at = Utc::now();
        let mut rng = rand::thread_rng();
        let references: HashSet<String> =
            (0..200).map(|_| quote_reference_at(at, &mut rng)).collect();
        assert_eq!(references.len(), 200);
    }

    #[test]
    fn generated_reference_has_expected_shape() {
        assert!(is_quote_reference(&generate_quote_reference()));
        assert!(!is_quote_reference("QTE-2024-ABC123"));
        assert!(!is_quote_reference("QTE-20240309140507-abc123"));
        assert!(!is_quote_reference("QUO-20240309140507-ABC123"));
    }
}
