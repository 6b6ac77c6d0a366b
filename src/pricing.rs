//! Booking price computation and validation.
//!
//! Dates arrive as display strings (`2025-07-01` or RFC 3339) and are
//! normalized to epoch milliseconds. The total is
//! `round(nights * rate * (1 - discount) + tax, 2)` unless the caller
//! supplies an explicit finite total.

use chrono::{DateTime, NaiveDate};

use crate::error::{AppError, AppResult};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Inputs for one booking quote. `discount` and `tax` default to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceInput<'a> {
    pub check_in: &'a str,
    pub check_out: &'a str,
    pub price_per_night: f64,
    pub discount: Option<f64>,
    pub tax: Option<f64>,
    pub total_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub check_in_at: i64,
    pub check_out_at: i64,
    pub nights: i64,
    pub total_price: f64,
}

/// Parses a check-in/check-out string into epoch milliseconds.
pub fn parse_date(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// At least one billable night, otherwise the rounded day count.
pub fn nights_between(check_in_at: i64, check_out_at: i64) -> i64 {
    let nights = ((check_out_at - check_in_at) as f64 / DAY_MS as f64).round() as i64;
    nights.max(1)
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Checks every pricing field; the first violation fails the whole input.
pub fn validate(input: &PriceInput<'_>) -> AppResult<(i64, i64)> {
    let (check_in_at, check_out_at) = match (parse_date(input.check_in), parse_date(input.check_out)) {
        (Some(a), Some(b)) if b > a => (a, b),
        _ => return Err(AppError::validation("bad dates")),
    };

    let rate = input.price_per_night;
    if !rate.is_finite() || rate < 0.0 {
        return Err(AppError::validation("bad pricePerNight"));
    }

    let discount = input.discount.unwrap_or(0.0);
    if !discount.is_finite() || !(0.0..=1.0).contains(&discount) {
        return Err(AppError::validation("bad discount"));
    }

    let tax = input.tax.unwrap_or(0.0);
    if !tax.is_finite() || tax < 0.0 {
        return Err(AppError::validation("bad tax"));
    }

    Ok((check_in_at, check_out_at))
}

/// Validates and prices a stay.
pub fn quote(input: &PriceInput<'_>) -> AppResult<Quote> {
    let (check_in_at, check_out_at) = validate(input)?;
    let nights = nights_between(check_in_at, check_out_at);

    let total_price = match input.total_price {
        Some(explicit) if explicit.is_finite() => explicit,
        _ => {
            let base = nights as f64 * input.price_per_night;
            let discounted = base * (1.0 - input.discount.unwrap_or(0.0));
            round_cents(discounted + input.tax.unwrap_or(0.0))
        }
    };

    Ok(Quote {
        check_in_at,
        check_out_at,
        nights,
        total_price,
    })
}
