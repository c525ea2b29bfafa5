//! Escaping and display formatting shared by card and detail templates.

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Attribute values additionally lose raw newlines.
#[must_use]
pub fn escape_attr(raw: &str) -> String {
    escape_html(raw).replace('\n', "&#10;").replace('\r', "")
}

/// Rounds half away from zero at two decimals.
#[must_use]
pub fn round_money(amount: f64) -> f64 {
    if !amount.is_finite() {
        return 0.0;
    }
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// `12.5` renders as `12.5`, `3.0` as `3`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", round_money(amount));
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

#[must_use]
pub fn format_money(amount: f64, currency: &str) -> String {
    let currency = currency.trim();
    let currency = if currency.is_empty() {
        crate::record::DEFAULT_CURRENCY
    } else {
        currency
    };
    format!("$ {} {currency}", format_amount(amount))
}
