use snaplayout_core::{LayerId, LayoutError, Result};

/// Layer a named cross-section is drawn on.
pub fn layer_for(cross_section: &str) -> Result<LayerId> {
    match cross_section {
        "strip" => Ok(1),
        "rib" => Ok(3),
        "metal" => Ok(41),
        other => Err(LayoutError::InvalidParameter {
            parameter: "cross_section".to_string(),
            reason: format!("unknown cross-section '{other}'"),
        }),
    }
}

/// Reject non-positive sizes.
pub(crate) fn positive(name: &str, value: f64) -> Result<f64> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(LayoutError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be positive, got {value}"),
        })
    }
}
