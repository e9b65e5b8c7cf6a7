use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How ordinary (grid) placements treat rotations off the 90-degree grid.
/// Virtual instances ignore this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Fail with `OffGridRotation`.
    #[default]
    Reject,
    /// Round to the nearest multiple of 90 degrees.
    Snap,
    /// Accept any angle.
    Free,
}

/// Settings shared by every component built in a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub position_tolerance: f64,
    pub width_tolerance: f64,
    pub rotation_policy: RotationPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            position_tolerance: 1e-9,
            width_tolerance: 1e-6, // 1 pm in microns
            rotation_policy: RotationPolicy::Reject,
        }
    }
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = LayoutConfig::from_json(r#"{ "rotation_policy": "snap" }"#).unwrap();
        assert_eq!(cfg.rotation_policy, RotationPolicy::Snap);
        assert_eq!(cfg.width_tolerance, 1e-6);
    }

    #[test]
    fn test_bad_json() {
        assert!(LayoutConfig::from_json("{ nope").is_err());
    }
}
