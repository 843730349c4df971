//! Parsing of the color parameter's several accepted wire encodings.

use serde_json::Value;

use vxd_core::{DaemonError, Rgba};

/// Parse a color parameter in any of the accepted encodings:
/// - `[r, g, b]` or `[r, g, b, a]` of integers `0..=255` or floats `0..=1`.
/// - A hex string `"#RRGGBB"` or `"#RRGGBBAA"`.
/// - An object `{r, g, b, a?}`.
///
/// Out-of-range components are clamped; a missing alpha defaults to 255.
///
/// # Errors
///
/// Returns [`DaemonError::InvalidParams`] if `value` matches none of the
/// accepted shapes.
pub fn parse_color(value: &Value) -> Result<Rgba, DaemonError> {
    match value {
        Value::Array(items) => parse_array(items),
        Value::String(s) => parse_hex(s),
        Value::Object(map) => parse_object(map),
        _ => Err(DaemonError::InvalidParams("color must be an array, hex string, or object".into())),
    }
}

fn parse_array(items: &[Value]) -> Result<Rgba, DaemonError> {
    if items.len() != 3 && items.len() != 4 {
        return Err(DaemonError::InvalidParams("color array must have 3 or 4 components".into()));
    }
    let mut channels = [255u8; 4];
    for (i, item) in items.iter().enumerate() {
        channels[i] = clamp_channel(item)?;
    }
    Ok(Rgba::new(channels[0], channels[1], channels[2], channels[3]))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel(value: &Value) -> Result<u8, DaemonError> {
    let n = value
        .as_f64()
        .ok_or_else(|| DaemonError::InvalidParams("color component must be numeric".into()))?;
    let scaled = if n <= 1.0 && n >= 0.0 { n * 255.0 } else { n };
    Ok(scaled.clamp(0.0, 255.0).round() as u8)
}

fn parse_hex(s: &str) -> Result<Rgba, DaemonError> {
    let hex = s.strip_prefix('#').ok_or_else(|| {
        DaemonError::InvalidParams(format!("color string must start with '#': {s}"))
    })?;
    let bytes = hex::decode(hex).map_err(|e| DaemonError::InvalidParams(e.to_string()))?;
    match bytes.as_slice() {
        [r, g, b] => Ok(Rgba::new(*r, *g, *b, 255)),
        [r, g, b, a] => Ok(Rgba::new(*r, *g, *b, *a)),
        _ => Err(DaemonError::InvalidParams(format!("hex color must be 6 or 8 digits: {s}"))),
    }
}

fn parse_object(map: &serde_json::Map<String, Value>) -> Result<Rgba, DaemonError> {
    let get = |key: &str| -> Result<u8, DaemonError> {
        map.get(key)
            .map_or(Ok(255), clamp_channel)
    };
    let r = map
        .get("r")
        .ok_or_else(|| DaemonError::MissingField("r".into()))
        .and_then(clamp_channel)?;
    let g = map
        .get("g")
        .ok_or_else(|| DaemonError::MissingField("g".into()))
        .and_then(clamp_channel)?;
    let b = map
        .get("b")
        .ok_or_else(|| DaemonError::MissingField("b".into()))
        .and_then(clamp_channel)?;
    let a = get("a")?;
    Ok(Rgba::new(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_array() {
        assert_eq!(parse_color(&serde_json::json!([255, 0, 0])).unwrap(), Rgba::new(255, 0, 0, 255));
    }

    #[test]
    fn parses_integer_array_with_alpha() {
        assert_eq!(
            parse_color(&serde_json::json!([255, 0, 0, 128])).unwrap(),
            Rgba::new(255, 0, 0, 128)
        );
    }

    #[test]
    fn parses_float_array_as_fractions() {
        assert_eq!(parse_color(&serde_json::json!([1.0, 0.0, 0.5])).unwrap(), Rgba::new(255, 0, 128, 255));
    }

    #[test]
    fn parses_six_digit_hex() {
        assert_eq!(parse_color(&serde_json::json!("#FF0000")).unwrap(), Rgba::new(255, 0, 0, 255));
    }

    #[test]
    fn parses_eight_digit_hex() {
        assert_eq!(parse_color(&serde_json::json!("#FF000080")).unwrap(), Rgba::new(255, 0, 0, 128));
    }

    #[test]
    fn parses_object_with_default_alpha() {
        assert_eq!(
            parse_color(&serde_json::json!({"r": 1, "g": 2, "b": 3})).unwrap(),
            Rgba::new(1, 2, 3, 255)
        );
    }

    #[test]
    fn clamps_out_of_range_components() {
        assert_eq!(parse_color(&serde_json::json!([300, -10, 0])).unwrap(), Rgba::new(255, 0, 0, 255));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(parse_color(&serde_json::json!("not-a-color")).is_err());
    }

    #[test]
    fn rejects_wrong_length_array() {
        assert!(parse_color(&serde_json::json!([1, 2])).is_err());
    }
}
