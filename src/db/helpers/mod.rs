// =====================================================
// HELPERS MODULE
// Numeric conversion and value stringification helpers
// =====================================================

use serde_json::Value;

/// Convert usize to i64, clamping to i64::MAX on overflow
pub fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Convert i64 to usize, returning 0 for negative values
pub fn i64_to_usize(value: i64) -> usize {
    if value <= 0 {
        0
    } else {
        usize::try_from(value).unwrap_or(usize::MAX)
    }
}

/// Reads a COUNT(*) value that may arrive as a number, numeric string or bool.
pub fn parse_count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_i64().and_then(|signed| u64::try_from(signed).ok())),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        Value::Bool(flag) => Some(u64::from(*flag)),
        _ => None,
    }
}

/// Stable text form of a scalar, used as a join-key token.
///
/// Returns `None` for null so callers can exclude the record.
pub fn value_to_key_token(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number_to_decimal_string(number)),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

/// Integral floats render without a fraction, so `1.0` and `1` agree.
pub fn number_to_decimal_string(number: &serde_json::Number) -> String {
    if let Some(signed) = number.as_i64() {
        return signed.to_string();
    }
    if let Some(unsigned) = number.as_u64() {
        return unsigned.to_string();
    }
    match number.as_f64() {
        Some(float) if float == 0.0 => "0".to_string(),
        Some(float) if float.is_finite() && float.fract() == 0.0 => format!("{:.0}", float),
        _ => number.to_string(),
    }
}

/// Truncate string to max_chars, adding "..." if truncated
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in value.chars().enumerate() {
        if idx >= max_chars {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests;
