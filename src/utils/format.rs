//! # Number Formatting
//!
//! Renders numbers with comma-grouped thousands, the way Python's `{:,.2f}`
//! format string does. Used for axis tick labels and for row counts in logs.

/// Inserts `,` separators into the integer part of an already formatted number.
///
/// The input may carry a leading `-` and a fractional part (`"1234567.5"`).
pub fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(dot) => unsigned.split_at(dot),
        None => (unsigned, ""),
    };

    let digits = int_part.len();
    let mut grouped = String::with_capacity(formatted.len() + digits / 3);
    grouped.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(frac_part);
    grouped
}

/// Formats `value` with `decimals` fractional digits and grouped thousands.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    group_thousands(&format!("{value:.decimals$}"))
}

/// Formats an integer count with grouped thousands (`1,234`).
pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}
