//! Formatting helpers shared by the metrics, renderers and CLI.

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole * 100`, or 0 when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Format an integer with thousands separators (e.g., "12,345").
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a float with one decimal, dropping a trailing `.0`.
pub fn format_decimal(value: f64) -> String {
    let rounded = round1(value);
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Format a signed change as `+12.5%` / `-3%`.
pub fn format_change(change_pct: f64) -> String {
    let sign = if change_pct > 0.0 { "+" } else { "" };
    format!("{}{}%", sign, format_decimal(change_pct))
}

/// Format a duration in hours (e.g., "45m", "3.5h", "2.1d").
pub fn format_hours(hours: f64) -> String {
    if hours <= 0.0 {
        "n/a".to_string()
    } else if hours < 1.0 {
        format!("{}m", (hours * 60.0).round() as u64)
    } else if hours < 48.0 {
        format!("{}h", format_decimal(hours))
    } else {
        format!("{}d", format_decimal(hours / 24.0))
    }
}

/// Turn a snake_case metric key into a display name.
///
/// `daily_active_pct` becomes `Daily Active Pct`.
pub fn humanize_metric(metric: &str) -> String {
    metric
        .split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercase the first character of a word.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Truncate to at most `max_chars` characters, appending "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(round1(50.0 / 30.0), 1.7);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(percentage(1, 0), 0.0);
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(100.0), "+100%");
        assert_eq!(format_change(-12.34), "-12.3%");
        assert_eq!(format_change(0.0), "0%");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(0.0), "n/a");
        assert_eq!(format_hours(0.5), "30m");
        assert_eq!(format_hours(3.5), "3.5h");
        assert_eq!(format_hours(72.0), "3d");
    }

    #[test]
    fn test_humanize_metric() {
        assert_eq!(humanize_metric("daily_active_pct"), "Daily Active Pct");
        assert_eq!(humanize_metric("reply_rate"), "Reply Rate");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }
}
