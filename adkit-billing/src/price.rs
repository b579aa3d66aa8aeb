//! Per-period price formatting.
//!
//! Store prices arrive pre-formatted for the user's locale, e.g. `"12.80 EUR"`
//! or `"₽ 1 299,00"`. The helpers here pull the number out, divide it, and put
//! it back next to the original currency text.

use rust_decimal::{Decimal, RoundingStrategy};
use std::ops::Range;
use std::str::FromStr;

/// Divide a formatted price by `divider`, e.g. a yearly price by 12.
///
/// The result keeps the currency text on the side it was found and uses a
/// comma as the decimal separator: `"12.80 EUR"` divided by 4 is `"3,20 EUR"`.
/// Amounts above 1000 are rounded to whole units. A divider of 1 returns the
/// input untouched. Returns `None` when no number can be found.
pub fn divide_formatted_price(price: &str, divider: u32) -> Option<String> {
    if divider == 1 {
        return Some(price.to_string());
    }
    if divider == 0 {
        return None;
    }

    let normalized = normalize_separators(strip_group_spaces(price).trim());
    let span = last_number(&normalized)?;
    let digits = &normalized[span.clone()];
    let value = match Decimal::from_str(digits) {
        Ok(value) => value / Decimal::from(divider),
        Err(e) => {
            crate::log_warn(&format!("unparseable price '{}': {}", price, e));
            return None;
        }
    };

    let currency = format!("{}{}", &normalized[..span.start], &normalized[span.end..]);
    let amount = format_amount(value);
    if normalized.starts_with(&currency) {
        Some(currency + &amount)
    } else {
        Some(amount + &currency)
    }
}

/// Drop whitespace runs between two digits ("1 299" becomes "1299").
fn strip_group_spaces(price: &str) -> String {
    let chars: Vec<char> = price.chars().collect();
    let mut out = String::with_capacity(price.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() && out.ends_with(|c: char| c.is_ascii_digit()) {
            let end = chars[i..]
                .iter()
                .position(|c| !c.is_whitespace())
                .map(|offset| i + offset)
                .unwrap_or(chars.len());
            if end < chars.len() && chars[end].is_ascii_digit() {
                i = end;
                continue;
            }
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// With both separators present, commas group thousands; otherwise a comma is
/// the decimal point.
fn normalize_separators(price: &str) -> String {
    if price.contains(',') && price.contains('.') && !price.ends_with('.') {
        price.replace(',', "")
    } else {
        price.replace(',', ".")
    }
}

/// Byte range of the last `digits[.digits]` run in `s`.
fn last_number(s: &str) -> Option<Range<usize>> {
    let bytes = s.as_bytes();
    let mut last = None;
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        last = Some(start..i);
    }
    last
}

fn format_amount(value: Decimal) -> String {
    let scale = if value > Decimal::from(1000) { 0 } else { 2 };
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded.to_string().replace('.', ",")
}
