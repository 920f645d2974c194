//! Valuation math: PER, PBR and trailing-twelve-month EPS.
//!
//! Everything in here is pure. Callers pass plain numbers and get back
//! `None` whenever a ratio is not computable.

use crate::models::QuarterlyEps;

/// Number of quarters summed into a trailing-twelve-month EPS.
pub const TTM_QUARTERS: usize = 4;

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Price-to-earnings ratio.
///
/// Returns `None` unless both price and EPS are present and strictly positive.
pub fn calc_per(price: Option<f64>, eps: Option<f64>) -> Option<f64> {
    let price = positive(price)?;
    let eps = positive(eps)?;
    Some(round2(price / eps))
}

/// Price-to-book ratio, same guards as [`calc_per`].
pub fn calc_pbr(price: Option<f64>, bps: Option<f64>) -> Option<f64> {
    let price = positive(price)?;
    let bps = positive(bps)?;
    Some(round2(price / bps))
}

/// Chronological sort key for a `YYYYQn` label.
///
/// Labels that don't match the pattern yield `None`, which orders before
/// every valid key.
pub fn quarter_sort_key(label: &str) -> Option<i32> {
    let (year, quarter) = label.split_once('Q')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    match quarter.as_bytes() {
        [q @ b'1'..=b'4'] => Some(year * 10 + i32::from(q - b'0')),
        _ => None,
    }
}

/// Check a label is a well-formed `YYYYQn`.
pub fn is_valid_quarter(label: &str) -> bool {
    quarter_sort_key(label).is_some()
}

/// Trailing-twelve-month EPS: the sum of the latest four quarters.
///
/// Entries with malformed labels sort as the oldest but still count
/// toward the four-entry threshold.
pub fn ttm_eps(entries: &[QuarterlyEps]) -> Option<f64> {
    if entries.len() < TTM_QUARTERS {
        return None;
    }

    let mut ordered: Vec<&QuarterlyEps> = entries.iter().collect();
    ordered.sort_by_key(|entry| quarter_sort_key(&entry.quarter));

    let sum: f64 = ordered[ordered.len() - TTM_QUARTERS..]
        .iter()
        .map(|entry| entry.eps)
        .sum();
    Some(round2(sum))
}
