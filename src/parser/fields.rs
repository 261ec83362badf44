//! Per-field extractors for raw listing text.
//!
//! Each function takes the raw text of one semantic field and returns a
//! typed value, or `None` when the field carries no matching content. The
//! markup behind these strings is inconsistent enough that every field gets
//! its own narrow rule instead of one record-level parser.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-+]?\d*\.\d+|\d+").unwrap());

/// Which of the listed amounts a price lookup should return.
///
/// Listing cards show either a single price or a struck-through original
/// price followed by the discounted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMode {
    Primary,
    Sale,
}

/// Extract a currency amount from the raw price text.
///
/// No amounts → `None` (the listing is fully booked). One amount → that is
/// the primary price and there is no sale. Two or more → the first is the
/// original price, the second the discounted one; extras are ignored.
pub fn parse_price(text: &str, mode: PriceMode) -> Option<i64> {
    let amounts: Vec<i64> = PRICE_RE
        .find_iter(text)
        .filter_map(|m| m.as_str()[1..].parse().ok())
        .collect();
    match (amounts.len(), mode) {
        (0, _) => None,
        (1, PriceMode::Sale) => None,
        (_, PriceMode::Primary) => Some(amounts[0]),
        (_, PriceMode::Sale) => Some(amounts[1]),
    }
}

/// Parse `"4-star"`-style text into a float.
///
/// Star rating is always present on a scraped card, so an unparseable
/// remainder is an error rather than an absence.
pub fn parse_star_rating(text: &str) -> Result<f64> {
    let stripped = text
        .trim()
        .trim_matches(|c| matches!(c, '-' | 's' | 't' | 'a' | 'r'));
    stripped
        .parse::<f64>()
        .with_context(|| format!("star rating {:?} is not numeric", text))
}

/// First run of digits in the review-count text, if any.
pub fn parse_num_reviews(text: &str) -> Option<i64> {
    DIGITS_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// First decimal-or-integer token in the guest-rating text.
pub fn parse_rating(text: &str) -> Option<f64> {
    NUMBER_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// The qualitative label left over once all numeric tokens are removed
/// from the guest-rating text, e.g. `"9.2 Wonderful"` → `"Wonderful"`.
pub fn parse_rating_sentiment(text: &str) -> Option<String> {
    let stripped = NUMBER_RE.replace_all(text, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Distance to the city center in miles, read from the landmarks text.
pub fn parse_landmarks(text: &str) -> Option<f64> {
    for marker in ["miles to City center", "mile to City center"] {
        if let Some((prefix, _)) = text.split_once(marker) {
            return prefix.trim().parse().ok();
        }
    }
    None
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_no_amounts() {
        assert_eq!(parse_price("Fully booked", PriceMode::Primary), None);
        assert_eq!(parse_price("Fully booked", PriceMode::Sale), None);
        assert_eq!(parse_price("", PriceMode::Primary), None);
    }

    #[test]
    fn price_single_amount() {
        assert_eq!(parse_price("$150", PriceMode::Primary), Some(150));
        assert_eq!(parse_price("$150", PriceMode::Sale), None);
        assert_eq!(parse_price("per night $89 total", PriceMode::Primary), Some(89));
    }

    #[test]
    fn price_original_and_sale() {
        assert_eq!(parse_price("$100 $80", PriceMode::Primary), Some(100));
        assert_eq!(parse_price("$100 $80", PriceMode::Sale), Some(80));
    }

    #[test]
    fn price_extra_amounts_ignored() {
        let text = "$120 $95 $410 total";
        assert_eq!(parse_price(text, PriceMode::Primary), Some(120));
        assert_eq!(parse_price(text, PriceMode::Sale), Some(95));
    }

    #[test]
    fn star_rating_integer_and_fractional() {
        assert_eq!(parse_star_rating("4-star").unwrap(), 4.0);
        assert_eq!(parse_star_rating("3.5-star").unwrap(), 3.5);
    }

    #[test]
    fn star_rating_rejects_non_numeric() {
        assert!(parse_star_rating("luxury").is_err());
        let err = parse_star_rating("-star").unwrap_err();
        assert!(err.to_string().contains("star rating"));
    }

    #[test]
    fn num_reviews_first_digit_run() {
        assert_eq!(parse_num_reviews("(134 reviews)"), Some(134));
        assert_eq!(parse_num_reviews("No reviews yet"), None);
    }

    #[test]
    fn rating_numeric_and_sentiment() {
        assert_eq!(parse_rating("4.5 Good"), Some(4.5));
        assert_eq!(parse_rating_sentiment("4.5 Good").as_deref(), Some("Good"));
        assert_eq!(parse_rating("Exceptional"), None);
        assert_eq!(
            parse_rating_sentiment("Exceptional").as_deref(),
            Some("Exceptional")
        );
        assert_eq!(parse_rating_sentiment("9.2"), None);
    }

    #[test]
    fn landmarks_miles_and_mile() {
        assert_eq!(parse_landmarks("0.3 miles to City center"), Some(0.3));
        assert_eq!(parse_landmarks("1 mile to City center"), Some(1.0));
        assert_eq!(parse_landmarks("Las Vegas Strip"), None);
    }

    #[test]
    fn landmarks_unparseable_prefix() {
        // Marker present but the prefix is not a bare number.
        assert_eq!(parse_landmarks("Near Strip2.5 miles to City center"), None);
    }
}
