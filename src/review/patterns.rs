//! Pattern learning: matching keys and confidence arithmetic

use uuid::Uuid;

use crate::types::*;

/// How many description tokens feed the matching key
const TOKEN_KEY_LEN: usize = 3;

/// Largest confidence boost a single pattern can contribute
const MAX_BOOST: u32 = 30;

/// Boost contributed per historical match of the pattern
const BOOST_PER_MATCH: u32 = 3;

/// Normalize a supplier name into a matching key: lowercased,
/// alphanumeric characters only.
pub fn supplier_key(supplier: &str) -> String {
    supplier
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a document description into a matching key: the first
/// few alphabetic tokens, lowercased. Numbers and dates are dropped so
/// "Frakt januar 2024" and "Frakt februar 2024" only differ in their
/// month token, not in noise.
pub fn token_key(description: &str) -> String {
    description
        .split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .take(TOKEN_KEY_LEN)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Confidence of a pattern from its accept/correct history, with
/// Laplace smoothing so a freshly learned pattern starts at 50 rather
/// than reading as certainty.
///
/// Monotonic: another acceptance never lowers the result.
pub fn pattern_confidence(accepted: u32, corrected: u32) -> u8 {
    let numerator = 100 * (u64::from(accepted) + 1);
    let denominator = u64::from(accepted) + u64::from(corrected) + 2;
    // Integer division keeps this deterministic across platforms
    (numerator / denominator).min(100) as u8
}

/// Confidence for an incoming item: the ingestion base plus a bounded
/// boost proportional to the matching pattern's usage history, capped
/// at 100. Monotonic in `match_count`.
pub fn boosted_confidence(base: u8, pattern: &Pattern) -> u8 {
    let boost = (BOOST_PER_MATCH * pattern.match_count).min(MAX_BOOST);
    (u32::from(base) + boost).min(100) as u8
}

/// Build a fresh pattern from a correction
pub fn pattern_from_correction(
    client_id: ClientId,
    supplier: &str,
    description: &str,
    target_account: &str,
) -> Pattern {
    let now = chrono::Utc::now().naive_utc();
    Pattern {
        id: Uuid::new_v4(),
        client_id,
        description: format!("{} -> account {}", supplier, target_account),
        supplier_key: supplier_key(supplier),
        token_key: token_key(description),
        target_account: target_account.to_string(),
        match_count: 0,
        accepted_count: 0,
        corrected_count: 0,
        confidence: pattern_confidence(0, 0),
        last_used: now,
        created_at: now,
    }
}

/// Fold one resolution observation into a pattern. A correction that
/// lands on the pattern's own target account confirms the mapping; a
/// correction to a different account counts against it and moves the
/// target.
pub fn observe_resolution(pattern: &mut Pattern, corrected_to: Option<&str>) {
    match corrected_to {
        None => pattern.accepted_count += 1,
        Some(account) if account == pattern.target_account => pattern.accepted_count += 1,
        Some(account) => {
            pattern.corrected_count += 1;
            pattern.target_account = account.to_string();
        }
    }
    pattern.confidence = pattern_confidence(pattern.accepted_count, pattern.corrected_count);
    pattern.last_used = chrono::Utc::now().naive_utc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_key_strips_punctuation_and_case() {
        assert_eq!(supplier_key("Bring Transport AS"), "bringtransportas");
        assert_eq!(supplier_key("BRING-TRANSPORT a.s."), "bringtransportas");
    }

    #[test]
    fn token_key_keeps_leading_words_only() {
        assert_eq!(token_key("Frakt januar 2024"), "frakt januar");
        assert_eq!(token_key("Frakt  JANUAR  faktura 12345 xy"), "frakt januar faktura");
    }

    #[test]
    fn fresh_pattern_confidence_is_half() {
        assert_eq!(pattern_confidence(0, 0), 50);
    }

    #[test]
    fn confidence_is_monotonic_in_acceptances() {
        let mut previous = pattern_confidence(0, 0);
        for accepted in 1..50 {
            let next = pattern_confidence(accepted, 0);
            assert!(next >= previous, "confidence dropped at {}", accepted);
            previous = next;
        }
        assert!(previous > 90);
    }

    #[test]
    fn corrections_count_against_confidence() {
        assert!(pattern_confidence(1, 3) < pattern_confidence(3, 1));
    }

    #[test]
    fn boost_grows_with_match_count_and_caps() {
        let client = uuid::Uuid::new_v4();
        let mut pattern = pattern_from_correction(client, "Bring", "Frakt januar", "6100");

        pattern.match_count = 1;
        let low = boosted_confidence(40, &pattern);
        pattern.match_count = 5;
        let mid = boosted_confidence(40, &pattern);
        pattern.match_count = 500;
        let capped = boosted_confidence(40, &pattern);

        assert!(low >= 40);
        assert!(mid >= low);
        assert_eq!(capped, 70); // base 40 + max boost 30
        assert_eq!(boosted_confidence(95, &pattern), 100);
    }

    #[test]
    fn observation_moves_target_on_divergent_correction() {
        let client = uuid::Uuid::new_v4();
        let mut pattern = pattern_from_correction(client, "Bring", "Frakt januar", "6100");

        observe_resolution(&mut pattern, None);
        assert_eq!(pattern.accepted_count, 1);
        assert_eq!(pattern.target_account, "6100");

        observe_resolution(&mut pattern, Some("4000"));
        assert_eq!(pattern.corrected_count, 1);
        assert_eq!(pattern.target_account, "4000");
    }
}
