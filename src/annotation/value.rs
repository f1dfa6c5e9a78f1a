// Attribute value parsing for annotation arguments

use super::{AnnotationError, ConstantResolver};
use crate::model::ConstantValue;

/// Strip redundant parentheses and Kotlin conversions such as `.toLong()`
fn normalize(text: &str) -> &str {
    let mut text = text.trim();
    loop {
        let before = text;
        if text.starts_with('(') && text.ends_with(')') && balanced(&text[1..text.len() - 1]) {
            text = text[1..text.len() - 1].trim();
        }
        for suffix in [".toLong()", ".toInt()", ".toDouble()", ".toFloat()"] {
            if let Some(stripped) = text.strip_suffix(suffix) {
                text = stripped.trim();
            }
        }
        if text == before {
            return text;
        }
    }
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn well_known_long(name: &str) -> Option<i64> {
    let name = name
        .trim_start_matches("java.lang.")
        .trim_start_matches("kotlin.");
    match name {
        "Long.MAX_VALUE" => Some(i64::MAX),
        "Long.MIN_VALUE" => Some(i64::MIN),
        "Integer.MAX_VALUE" | "Int.MAX_VALUE" => Some(i32::MAX as i64),
        "Integer.MIN_VALUE" | "Int.MIN_VALUE" => Some(i32::MIN as i64),
        "Short.MAX_VALUE" => Some(i16::MAX as i64),
        "Short.MIN_VALUE" => Some(i16::MIN as i64),
        "Byte.MAX_VALUE" => Some(i8::MAX as i64),
        "Byte.MIN_VALUE" => Some(i8::MIN as i64),
        _ => None,
    }
}

fn well_known_double(name: &str) -> Option<f64> {
    let name = name
        .trim_start_matches("java.lang.")
        .trim_start_matches("kotlin.");
    match name {
        "Double.POSITIVE_INFINITY" | "Float.POSITIVE_INFINITY" => Some(f64::INFINITY),
        "Double.NEGATIVE_INFINITY" | "Float.NEGATIVE_INFINITY" => Some(f64::NEG_INFINITY),
        "Double.MAX_VALUE" => Some(f64::MAX),
        "Float.MAX_VALUE" => Some(f32::MAX as f64),
        "Double.MIN_VALUE" => Some(f64::MIN_POSITIVE),
        "Float.MIN_VALUE" => Some(f32::MIN_POSITIVE as f64),
        _ => well_known_long(name).map(|v| v as f64),
    }
}

/// Parse an integer literal into its magnitude; `None` if it is not one
fn parse_integer_literal(text: &str) -> Option<i128> {
    let mut cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if cleaned.ends_with(['L', 'l']) {
        cleaned.pop();
    }
    if cleaned.ends_with(['u', 'U']) {
        cleaned.pop();
    }

    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') && lower.chars().all(|c| c.is_ascii_digit()) {
        i128::from_str_radix(&lower[1..], 8).ok()
    } else if !lower.is_empty() && lower.chars().all(|c| c.is_ascii_digit()) {
        lower.parse::<i128>().ok()
    } else {
        None
    }
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, text.strip_prefix('+').unwrap_or(text).trim()),
    }
}

/// `MAX`, `Constants.MAX`, `com.example.Constants.MAX`
fn is_identifier_path(text: &str) -> bool {
    text.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

fn constant_name(text: &str) -> &str {
    text.rsplit('.').next().unwrap_or(text)
}

pub fn parse_long(
    attribute: &str,
    text: &str,
    resolver: &dyn ConstantResolver,
) -> Result<i64, AnnotationError> {
    let text = normalize(text);
    if let Some(value) = well_known_long(text) {
        return Ok(value);
    }

    let (negative, magnitude) = split_sign(text);
    if negative {
        if let Some(value) = well_known_long(magnitude) {
            return value.checked_neg().ok_or_else(|| invalid(attribute, text));
        }
    }
    if let Some(value) = parse_integer_literal(magnitude) {
        let value = if negative { -value } else { value };
        return i64::try_from(value).map_err(|_| invalid(attribute, text));
    }

    if is_identifier_path(magnitude) {
        return match resolver.resolve(constant_name(magnitude)) {
            Some(ConstantValue::Int(value)) if negative => {
                value.checked_neg().ok_or_else(|| invalid(attribute, text))
            }
            Some(ConstantValue::Int(value)) => Ok(value),
            Some(_) => Err(invalid(attribute, text)),
            None => Err(AnnotationError::UnresolvedConstant {
                attribute: attribute.to_string(),
                name: magnitude.to_string(),
            }),
        };
    }

    Err(invalid(attribute, text))
}

pub fn parse_double(
    attribute: &str,
    text: &str,
    resolver: &dyn ConstantResolver,
) -> Result<f64, AnnotationError> {
    let text = normalize(text);
    if let Some(value) = well_known_double(text) {
        return Ok(value);
    }

    let (negative, magnitude) = split_sign(text);
    let sign = if negative { -1.0 } else { 1.0 };
    if let Some(value) = well_known_double(magnitude) {
        return Ok(sign * value);
    }
    if let Some(value) = parse_integer_literal(magnitude) {
        return Ok(sign * value as f64);
    }

    let cleaned: String = magnitude.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.trim_end_matches(['f', 'F', 'd', 'D']);
    if cleaned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return cleaned
            .parse::<f64>()
            .map(|value| sign * value)
            .map_err(|_| invalid(attribute, text));
    }

    if is_identifier_path(magnitude) {
        return match resolver.resolve(constant_name(magnitude)) {
            Some(ConstantValue::Int(value)) => Ok(sign * value as f64),
            Some(ConstantValue::Float(value)) => Ok(sign * value),
            Some(ConstantValue::Str(_) | ConstantValue::Array(_)) => Err(invalid(attribute, text)),
            None => Err(AnnotationError::UnresolvedConstant {
                attribute: attribute.to_string(),
                name: magnitude.to_string(),
            }),
        };
    }

    Err(invalid(attribute, text))
}

pub fn parse_bool(attribute: &str, text: &str) -> Result<bool, AnnotationError> {
    match normalize(text) {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(attribute, other)),
    }
}

fn invalid(attribute: &str, text: &str) -> AnnotationError {
    AnnotationError::InvalidValue {
        attribute: attribute.to_string(),
        value: text.to_string(),
    }
}

/// Evaluate literal source text as a constant (used for `static final`
/// initializers and guard operands)
pub fn parse_literal(text: &str) -> Option<ConstantValue> {
    let text = normalize(text);
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Some(ConstantValue::Str(unescape(&text[1..text.len() - 1])));
    }
    let (negative, magnitude) = split_sign(text);
    if let Some(value) = parse_integer_literal(magnitude) {
        let value = if negative { -value } else { value };
        return i64::try_from(value).ok().map(ConstantValue::Int);
    }
    let cleaned: String = magnitude.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.trim_end_matches(['f', 'F', 'd', 'D']);
    if cleaned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && cleaned.chars().any(|c| c.is_ascii_digit())
    {
        let value: f64 = cleaned.parse().ok()?;
        return Some(ConstantValue::Float(if negative { -value } else { value }));
    }
    None
}

/// Resolve simple escape sequences so string lengths count characters
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => out.push('?'),
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
