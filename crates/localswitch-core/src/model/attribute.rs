// ── Measurement attributes ──

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub const ATTR_CURRENT: &str = "current";
pub const ATTR_CURRENT_CONSUMPTION: &str = "current_consumption";
pub const ATTR_VOLTAGE: &str = "voltage";

/// Attribute name to value, only for configured attributes.
pub type Attributes = BTreeMap<&'static str, AttributeValue>;

/// A measurement as exposed to the host.
///
/// Current is reported by the device in mA and passed through as is.
/// Consumption and voltage are fixed-point with one decimal, so they are
/// divided by ten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Decimal(f64),
}

impl AttributeValue {
    /// Interpret a raw device integer with one implied decimal place.
    pub fn tenths(raw: i64) -> Self {
        // Readings are far below 2^52, so the conversion is exact.
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        Self::Decimal(raw as f64 / 10.0)
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            Self::Integer(n) => n as f64,
            Self::Decimal(x) => x,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(x) => write!(f, "{x:.1}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenths_scales_fixed_point() {
        assert_eq!(AttributeValue::tenths(305), AttributeValue::Decimal(30.5));
        assert_eq!(AttributeValue::tenths(2300).to_string(), "230.0");
    }

    #[test]
    fn integer_passes_through() {
        let current = AttributeValue::Integer(120);
        assert_eq!(current.to_string(), "120");
        assert!((current.as_f64() - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_as_bare_numbers() {
        let mut attrs = Attributes::new();
        attrs.insert(ATTR_CURRENT, AttributeValue::Integer(120));
        attrs.insert(ATTR_VOLTAGE, AttributeValue::tenths(2300));
        let json = serde_json::to_string(&attrs).unwrap_or_default();
        assert_eq!(json, r#"{"current":120,"voltage":230.0}"#);
    }
}
