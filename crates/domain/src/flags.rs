use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Returns whether a loosely-typed payload value means "on".
///
/// Accepts numeric `1`, boolean `true`, and the string `"1"`. Every other
/// value, including a missing one, is "off".
#[must_use]
pub fn is_truthy_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64() == Some(1.0),
        Some(Value::String(text)) => text == "1",
        _ => false,
    }
}

/// Coerces a loosely-typed payload flag into the canonical `0`/`1` form.
#[must_use]
pub fn coerce_flag(value: Option<&Value>) -> u8 {
    u8::from(is_truthy_flag(value))
}

/// Serde helper accepting `true`, `1`, `"1"`, and `"true"` as `true`.
///
/// `null` and absent values decode as `false`.
pub fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text == "1" || text.eq_ignore_ascii_case("true"),
        other => is_truthy_flag(other.as_ref()),
    })
}
