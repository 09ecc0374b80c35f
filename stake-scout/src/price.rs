//! Price normalisation: raw localised price text to an exact decimal.
//!
//! All configured sources publish prices in a single locale: a comma is a
//! thousands separator and a dot is the decimal point. This is not a general
//! money parser. Anything outside that convention (e.g. `1.860,50`) either
//! fails or parses to a different number.
//!
//! The number is taken from the first run of digits in the text, so currency
//! prefixes such as `Rs.` or `₹` (including the abbreviation dot) and suffixes
//! such as `/-` are discarded. A minus sign directly before the first digit is
//! kept.

use rust_decimal::Decimal;

use crate::error::{Result, ScoutError};

/// Normalise raw price text into a decimal value.
///
/// # Errors
///
/// Returns [`ScoutError::UnparseablePrice`] when the text holds no digits or
/// the numeric run is malformed (for example two decimal points). Never
/// returns a silent zero.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
///
/// let price = stake_scout::price::normalize("Rs. 2,100").unwrap();
/// assert_eq!(price, Decimal::from(2100));
/// assert!(stake_scout::price::normalize("N/A").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<Decimal> {
    let run = numeric_run(raw).ok_or_else(|| ScoutError::UnparseablePrice(raw.to_owned()))?;

    let cleaned: String = run.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim_end_matches('.');

    cleaned
        .parse::<Decimal>()
        .map_err(|_| ScoutError::UnparseablePrice(raw.to_owned()))
}

/// Locate the first numeric run: digits, commas and dots starting at the
/// first digit, plus a directly preceding minus sign.
fn numeric_run(raw: &str) -> Option<&str> {
    let first_digit = raw.find(|c: char| c.is_ascii_digit())?;

    let start = if raw[..first_digit].ends_with('-') {
        first_digit - 1
    } else {
        first_digit
    };

    let end = raw[first_digit..]
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .map_or(raw.len(), |offset| first_digit + offset);

    Some(&raw[start..end])
}
