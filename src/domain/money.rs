/// Rounds a currency amount to whole cents.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid printing "-$0.00".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Formats an amount as US dollars with thousands separators, e.g. `$1,234.50`.
pub fn format_money(value: f64) -> String {
    let cents = (round2(value) * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (index, ch) in dollars.chars().enumerate() {
        if index > 0 && (dollars.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Formats a quantity with at most two decimals and no trailing zeros.
pub fn format_quantity(value: f64) -> String {
    let rendered = format!("{:.2}", round2(value));
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
