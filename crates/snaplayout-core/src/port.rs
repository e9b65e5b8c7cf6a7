use serde::{Deserialize, Serialize};

use crate::error::PortMismatch;
use crate::geometry::Point;
use crate::transform::{normalize_angle, Transform};

/// What a port carries. Ports only connect to ports of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortType {
    #[default]
    Optical,
    Electrical,
    Placement,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PortType::Optical => "optical",
            PortType::Electrical => "electrical",
            PortType::Placement => "placement",
        };
        f.write_str(s)
    }
}

/// A named, oriented anchor on a component.
///
/// `orientation` is the direction, in degrees, the port faces out of its
/// component. Two ports are connected when they sit on the same point and
/// face each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub position: Point,
    pub orientation: f64,
    pub width: f64,
    #[serde(default)]
    pub cross_section: Option<String>,
    #[serde(default)]
    pub port_type: PortType,
}

impl Port {
    pub fn new(name: &str, position: Point, orientation: f64, width: f64) -> Self {
        Self {
            name: name.to_string(),
            position,
            orientation: normalize_angle(orientation),
            width,
            cross_section: None,
            port_type: PortType::default(),
        }
    }

    pub fn with_cross_section(mut self, cross_section: &str) -> Self {
        self.cross_section = Some(cross_section.to_string());
        self
    }

    pub fn with_type(mut self, port_type: PortType) -> Self {
        self.port_type = port_type;
        self
    }

    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// This port expressed in the frame `transform` maps into.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            position: transform.apply(&self.position),
            orientation: transform.apply_angle(self.orientation),
            ..self.clone()
        }
    }

    /// Check that `self` may be connected onto `other`.
    ///
    /// Width is compared within `width_tolerance`; cross-sections only when
    /// both ports name one.
    pub fn check_compatible(
        &self,
        other: &Port,
        width_tolerance: f64,
        check_width: bool,
    ) -> Result<(), PortMismatch> {
        if check_width && (self.width - other.width).abs() > width_tolerance {
            return Err(PortMismatch::Width {
                moving: self.width,
                fixed: other.width,
            });
        }
        if let (Some(a), Some(b)) = (&self.cross_section, &other.cross_section) {
            if a != b {
                return Err(PortMismatch::CrossSection {
                    moving: a.clone(),
                    fixed: b.clone(),
                });
            }
        }
        if self.port_type != other.port_type {
            return Err(PortMismatch::PortType {
                moving: self.port_type.to_string(),
                fixed: other.port_type.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_transformed() {
        let p = Port::new("o2", Point::new(10.0, 0.0), 0.0, 0.5);
        let t = Transform::new(Point::new(1.0, 1.0), 90.0, false);
        let q = p.transformed(&t);
        assert_eq!(q.position, Point::new(1.0, 11.0));
        assert_eq!(q.orientation, 90.0);
        assert_eq!(q.name, "o2");
    }

    #[test]
    fn test_width_mismatch() {
        let a = Port::new("a", Point::origin(), 0.0, 0.5);
        let b = Port::new("b", Point::origin(), 180.0, 0.4);
        assert!(matches!(
            a.check_compatible(&b, 1e-6, true),
            Err(PortMismatch::Width { .. })
        ));
        assert!(a.check_compatible(&b, 1e-6, false).is_ok());
    }

    #[test]
    fn test_cross_section_only_checked_when_both_set() {
        let a = Port::new("a", Point::origin(), 0.0, 0.5).with_cross_section("strip");
        let b = Port::new("b", Point::origin(), 0.0, 0.5);
        assert!(a.check_compatible(&b, 1e-6, true).is_ok());
        let c = b.with_cross_section("rib");
        assert!(matches!(
            a.check_compatible(&c, 1e-6, true),
            Err(PortMismatch::CrossSection { .. })
        ));
    }

    #[test]
    fn test_port_type_mismatch() {
        let a = Port::new("a", Point::origin(), 0.0, 10.0);
        let b = Port::new("e1", Point::origin(), 0.0, 10.0).with_type(PortType::Electrical);
        assert!(matches!(
            a.check_compatible(&b, 1e-6, true),
            Err(PortMismatch::PortType { .. })
        ));
    }
}
