/// Characters that leak into exported headers and cells from upstream tools.
const STRAY_CHARS: &[char] = &['"', '[', ']', '{', '}'];

/// Trim whitespace and strip stray quote/bracket characters anywhere in the field.
pub fn clean_str(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !STRAY_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a monetary cell such as `"$1,234.50"`, `-12` or `(12.50)`.
/// Returns None for anything that is not a finite number once currency
/// symbols and thousands separators are gone.
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Round to `places` decimal places, half away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `1234567.891` → `"$1,234,567.89"`.
pub fn format_currency(value: f64) -> String {
    let rounded = round_to(value.abs(), 2);
    let whole = rounded.trunc() as u64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && rounded > 0.0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents)
}
