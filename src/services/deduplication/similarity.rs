//! Fuzzy digest comparison.
//!
//! Scores two encoded fuzzy digests from 0 to 100 by comparing their tokens
//! position by position. No alignment search is done: an insertion or
//! deletion shifts every later chunk and collapses the score.

use crate::models::FUZZY_SEPARATOR;
use thiserror::Error;

/// Token-count divergence allowed before two digests are treated as
/// structurally different, as a fraction of the first digest's count.
///
/// Kept as an integer ratio (3/10) so the check is exact.
const SIZE_DIVERGENCE_NUMERATOR: usize = 3;
const SIZE_DIVERGENCE_DENOMINATOR: usize = 10;

/// Reasons a fuzzy digest cannot be compared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparisonError {
    /// A token between two separators is empty.
    #[error("empty token at position {position}")]
    EmptyToken {
        /// Zero-based token position.
        position: usize,
    },

    /// A token contains non-hex characters.
    #[error("malformed token '{token}' at position {position}")]
    MalformedToken {
        /// Zero-based token position.
        position: usize,
        /// The offending token.
        token: String,
    },
}

/// Scores the similarity of two fuzzy digests.
///
/// Returns 0 when either digest is empty or malformed, so a corrupt corpus
/// entry never aborts a scan.
///
/// # Example
///
/// ```rust
/// use dupcheck::similarity;
///
/// assert_eq!(similarity("aaaaaaaa:bbbbbbbb", "aaaaaaaa:bbbbbbbb"), 100);
/// assert_eq!(similarity("aaaaaaaa:bbbbbbbb", "aaaaaaaa:cccccccc"), 50);
/// assert_eq!(similarity("", "aaaaaaaa"), 0);
/// ```
#[must_use]
pub fn similarity(a: &str, b: &str) -> u8 {
    try_similarity(a, b).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Fuzzy digest not comparable, scoring 0");
        0
    })
}

/// Scores the similarity of two fuzzy digests, reporting malformed input.
///
/// 1. Either digest empty: 0.
/// 2. `|count_a - count_b| > 0.3 * count_a`: 0.
/// 3. Otherwise the share of equal tokens over the first
///    `min(count_a, count_b)` positions, as a rounded percentage.
///
/// Step 2 is relative to `a`, so the score is not symmetric when the
/// token counts differ.
///
/// # Errors
///
/// Returns a [`ComparisonError`] if a non-empty digest has an empty or
/// non-hex token.
pub fn try_similarity(a: &str, b: &str) -> Result<u8, ComparisonError> {
    if a.is_empty() || b.is_empty() {
        return Ok(0);
    }

    let tokens_a = parse_tokens(a)?;
    let tokens_b = parse_tokens(b)?;
    let count_a = tokens_a.len();
    let count_b = tokens_b.len();

    let size_diff = count_a.abs_diff(count_b);
    if size_diff * SIZE_DIVERGENCE_DENOMINATOR > count_a * SIZE_DIVERGENCE_NUMERATOR {
        return Ok(0);
    }

    let min_len = count_a.min(count_b);
    let matches = tokens_a
        .iter()
        .zip(&tokens_b)
        .filter(|(x, y)| x == y)
        .count();

    Ok(rounded_percent(matches, min_len))
}

/// Token-count window within which a digest of `count` tokens can score
/// above zero against another digest.
///
/// Returns `None` for an empty digest, which never scores above zero.
#[must_use]
pub const fn comparable_token_range(count: usize) -> Option<(usize, usize)> {
    if count == 0 {
        return None;
    }
    let max_diff = count * SIZE_DIVERGENCE_NUMERATOR / SIZE_DIVERGENCE_DENOMINATOR;
    Some((count - max_diff, count + max_diff))
}

fn parse_tokens(digest: &str) -> Result<Vec<&str>, ComparisonError> {
    digest
        .split(FUZZY_SEPARATOR)
        .enumerate()
        .map(|(position, token)| {
            if token.is_empty() {
                Err(ComparisonError::EmptyToken { position })
            } else if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                Err(ComparisonError::MalformedToken {
                    position,
                    token: token.to_string(),
                })
            } else {
                Ok(token)
            }
        })
        .collect()
}

/// `round(100 * part / whole)` with halves rounded up, clamped to 100.
#[allow(clippy::cast_possible_truncation)] // Clamped to 100 before the cast
fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let percent = (200 * part + whole) / (2 * whole);
    percent.min(100) as u8
}
