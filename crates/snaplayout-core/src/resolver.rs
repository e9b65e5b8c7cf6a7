//! Port connection resolver.
//!
//! Given a port of the component being placed (in that component's own
//! frame) and a target port already in the parent frame, compute the
//! placement that puts the two ports on the same point facing each other.

use crate::error::{LayoutError, Result};
use crate::geometry::Point;
use crate::port::Port;
use crate::transform::{normalize_angle, Transform};

/// Options for a single connection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConnectOptions {
    /// Place the moving component mirrored about its x axis.
    pub mirror: bool,
    /// Skip the width check. Cross-section and type are still checked.
    pub allow_width_mismatch: bool,
}

impl ConnectOptions {
    pub fn mirrored() -> Self {
        Self {
            mirror: true,
            ..Self::default()
        }
    }
}

/// Resolve the transform aligning `moving` onto `fixed` with default options.
pub fn resolve(moving: &Port, fixed: &Port, width_tolerance: f64) -> Result<Transform> {
    resolve_with(moving, fixed, width_tolerance, ConnectOptions::default())
}

pub fn resolve_with(
    moving: &Port,
    fixed: &Port,
    width_tolerance: f64,
    options: ConnectOptions,
) -> Result<Transform> {
    moving
        .check_compatible(fixed, width_tolerance, !options.allow_width_mismatch)
        .map_err(|reason| LayoutError::PortIncompatible {
            moving: moving.name.clone(),
            fixed: fixed.name.clone(),
            reason,
        })?;

    let local = if options.mirror {
        -moving.orientation
    } else {
        moving.orientation
    };
    let rotation = normalize_angle(fixed.orientation + 180.0 - local);

    let linear = Transform::new(Point::origin(), rotation, options.mirror);
    let turned = linear.apply_linear(&moving.position);
    let offset = Point::new(
        fixed.position.x - turned.x,
        fixed.position.y - turned.y,
    );

    log::debug!(
        "resolved {} -> {}: rotation {:.6}, offset ({:.6}, {:.6})",
        moving.name,
        fixed.name,
        rotation,
        offset.x,
        offset.y
    );

    Ok(Transform {
        offset,
        ..linear
    })
}
