/// Two decimals with thousands separators: `65000.0` -> `"65,000.00"`.
pub fn format_price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Signed percentage: `1.5625` -> `"+1.56%"`.
pub fn format_percent(percent: f64) -> String {
    let sign = if percent >= 0.0 { "+" } else { "" };
    format!("{sign}{percent:.2}%")
}

/// Coarse relative time such as "3 minutes ago".
pub fn time_ago(then_ms: i64, now_ms: i64) -> String {
    let secs = (now_ms.saturating_sub(then_ms) / 1000).max(0);

    let (amount, unit) = match secs {
        0..=44 => return "less than a minute ago".to_string(),
        45..=3_599 => ((secs + 30) / 60, "minute"),
        3_600..=86_399 => ((secs + 1_800) / 3_600, "hour"),
        86_400..=2_591_999 => ((secs + 43_200) / 86_400, "day"),
        _ => ((secs + 1_296_000) / 2_592_000, "month"),
    };

    let amount = amount.max(1);
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_are_grouped() {
        assert_eq!(format_price(65_000.0), "65,000.00");
        assert_eq!(format_price(1_234_567.891), "1,234,567.89");
        assert_eq!(format_price(999.999), "1,000.00");
        assert_eq!(format_price(0.5), "0.50");
        assert_eq!(format_price(-1_000.0), "-1,000.00");
    }

    #[test]
    fn percents_carry_sign() {
        assert_eq!(format_percent(1.5625), "+1.56%");
        assert_eq!(format_percent(-1.538_461), "-1.54%");
        assert_eq!(format_percent(0.0), "+0.00%");
    }

    #[test]
    fn relative_times() {
        let now = 10_000_000_000;
        assert_eq!(time_ago(now - 5_000, now), "less than a minute ago");
        assert_eq!(time_ago(now - 60_000, now), "1 minute ago");
        assert_eq!(time_ago(now - 5 * 60_000, now), "5 minutes ago");
        assert_eq!(time_ago(now - 2 * 3_600_000, now), "2 hours ago");
        assert_eq!(time_ago(now - 3 * 86_400_000, now), "3 days ago");
        // clock skew: saved "in the future"
        assert_eq!(time_ago(now + 60_000, now), "less than a minute ago");
    }
}
