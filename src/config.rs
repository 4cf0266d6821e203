use crate::model::DEFAULT_AFFINE_LIMIT;
use serde::{Deserialize, Serialize};

/// Engine-wide knobs. Missing JSON fields fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Step budget of the affine neighbour search; files may override it per tiling.
    pub affine_limit: usize,
    /// Replace tilings with mirrored gluings by their orientable double cover.
    pub unmirror: bool,
    pub minimize_on_convert: bool,
    /// Emit converted shapes in reverse class order.
    pub reverse_order: bool,
    /// How many already-analysed cells conversion may re-examine.
    pub convert_retest_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            affine_limit: DEFAULT_AFFINE_LIMIT,
            unmirror: true,
            minimize_on_convert: false,
            reverse_order: false,
            convert_retest_budget: 1000,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let c = EngineConfig::from_json(r#"{"minimize_on_convert": true}"#).unwrap();
        assert!(c.minimize_on_convert);
        assert!(c.unmirror);
        assert_eq!(c.affine_limit, DEFAULT_AFFINE_LIMIT);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(EngineConfig::from_json(r#"{"unmirror": 3}"#).is_err());
    }

    #[test]
    fn json_roundtrip() {
        let c = EngineConfig { reverse_order: true, convert_retest_budget: 5, ..EngineConfig::default() };
        assert_eq!(EngineConfig::from_json(&c.to_json().unwrap()).unwrap(), c);
    }

    #[test]
    fn saved_json_names_every_field() {
        let v: serde_json::Value = serde_json::from_str(&EngineConfig::default().to_json().unwrap()).unwrap();
        assert_eq!(v["affine_limit"], DEFAULT_AFFINE_LIMIT);
        assert_eq!(v["unmirror"], true);
        assert_eq!(v["convert_retest_budget"], 1000);
    }
}
