//! Number rendering shared by constraint descriptions.

/// Render a double the way `Double.toString` does on the JVM, since lint
/// messages are compared against that output (`7.0`, `2.5`, `1.0E10`).
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let magnitude = value.abs();
    if (1e-3..1e7).contains(&magnitude) {
        let text = value.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        // Rust prints the shortest round-tripping mantissa as "1.5e10"
        let text = format!("{:e}", value);
        let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
        if mantissa.contains('.') {
            format!("{}E{}", mantissa, exponent)
        } else {
            format!("{}.0E{}", mantissa, exponent)
        }
    }
}

/// Strip a trailing float suffix from literal source text (`2.49f` -> `2.49`).
pub fn strip_float_suffix(text: &str) -> &str {
    text.strip_suffix(['f', 'F']).unwrap_or(text)
}
