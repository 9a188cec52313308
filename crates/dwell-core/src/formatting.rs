use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use dwell_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    // Handle the sign separately so the thousands grouping works on the
    // absolute value.
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a fraction of an ULP before rounding so exact midpoints do not
    // round down due to binary representation.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` starts with "0.", keep only ".NN".
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a dwell duration in seconds as a compact human-readable string.
///
/// * `< 60` seconds → `"42.5s"` (one decimal)
/// * `< 1` hour → `"12m 5s"`
/// * otherwise → `"2h 3m 5s"`
///
/// # Examples
///
/// ```
/// use dwell_core::formatting::format_duration;
///
/// assert_eq!(format_duration(0.0),    "0.0s");
/// assert_eq!(format_duration(42.3),   "42.3s");
/// assert_eq!(format_duration(725.0),  "12m 5s");
/// assert_eq!(format_duration(7385.0), "2h 3m 5s");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }
    let total = seconds.round() as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours == 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}h {}m {}s", hours, mins, secs)
    }
}

/// Format a fraction in `[0, 1]` as a percentage with two decimals.
///
/// ```
/// use dwell_core::formatting::format_percent;
///
/// assert_eq!(format_percent(0.5), "50.00%");
/// assert_eq!(format_percent(0.0125), "1.25%");
/// ```
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Fit `s` into exactly `width` terminal columns.
///
/// Longer strings are cut and end with `…`; shorter ones are padded with
/// spaces on the right (or left when `right_align` is set).
pub fn fit_width(s: &str, width: usize, right_align: bool) -> String {
    let current = UnicodeWidthStr::width(s);
    if current <= width {
        let pad = " ".repeat(width - current);
        return if right_align {
            format!("{pad}{s}")
        } else {
            format!("{s}{pad}")
        };
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
