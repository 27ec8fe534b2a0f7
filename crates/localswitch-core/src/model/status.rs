// ── Device status report ──

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Value of a single data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DpValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl DpValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for DpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for DpValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for DpValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<String> for DpValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One full status report, keyed by data point index (`"1"`, `"18"`, ...).
///
/// Deserializes from the `{"dps": {...}}` shape devices answer with.
/// Shared behind an `Arc` once fetched and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBlob {
    #[serde(default)]
    dps: BTreeMap<String, DpValue>,
}

impl StatusBlob {
    pub fn new(dps: BTreeMap<String, DpValue>) -> Self {
        Self { dps }
    }

    pub fn get(&self, key: &str) -> Option<&DpValue> {
        self.dps.get(key)
    }

    pub fn dps(&self) -> &BTreeMap<String, DpValue> {
        &self.dps
    }

    pub fn len(&self) -> usize {
        self.dps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dps.is_empty()
    }

    /// On/off state of the switch at `switch_index`.
    pub fn switch_state(&self, switch_index: &str) -> Result<bool, CoreError> {
        self.get(switch_index)
            .ok_or_else(|| CoreError::SwitchStateMissing {
                switch_index: switch_index.to_owned(),
            })?
            .as_bool()
            .ok_or_else(|| CoreError::InvalidSwitchState {
                switch_index: switch_index.to_owned(),
            })
    }
}

impl<K: Into<String>> FromIterator<(K, DpValue)> for StatusBlob {
    fn from_iter<I: IntoIterator<Item = (K, DpValue)>>(iter: I) -> Self {
        Self {
            dps: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_device_report() {
        let blob: StatusBlob = serde_json::from_value(json!({
            "devId": "12345678912345671234",
            "dps": { "1": true, "7": false, "18": 120, "19": 305, "20": 2300, "9": "cycle" }
        }))
        .unwrap();

        assert_eq!(blob.len(), 6);
        assert_eq!(blob.get("1"), Some(&DpValue::Bool(true)));
        assert_eq!(blob.get("18"), Some(&DpValue::Integer(120)));
        assert_eq!(blob.get("9"), Some(&DpValue::Text("cycle".into())));
    }

    #[test]
    fn missing_dps_is_an_empty_report() {
        let blob: StatusBlob = serde_json::from_value(json!({ "devId": "x" })).unwrap();
        assert!(blob.is_empty());
    }

    #[test]
    fn switch_state_requires_a_boolean() {
        let blob: StatusBlob = [("1", DpValue::Bool(false)), ("18", DpValue::Integer(3))]
            .into_iter()
            .collect();

        assert!(!blob.switch_state("1").unwrap());
        assert!(matches!(
            blob.switch_state("18"),
            Err(CoreError::InvalidSwitchState { .. })
        ));
        assert!(matches!(
            blob.switch_state("7"),
            Err(CoreError::SwitchStateMissing { switch_index }) if switch_index == "7"
        ));
    }
}
