use snaplayout_core::{
    Component, LayoutError, Library, Params, Point, Polygon, Port, Result, Transform,
};

use crate::cross_section::{layer_for, positive};

pub fn defaults() -> Params {
    Params::new()
        .with("radius", 10.0)
        .with("width", 0.5)
        .with("angle", 90.0)
        .with("cross_section", "strip")
        .with("npoints", 128)
}

/// A circular bend turning left by `angle` degrees.
///
/// `o1` sits at the origin facing west; the arc is centered at
/// `(0, radius)` and `o2` faces `angle` at the end of the arc.
/// `npoints` is the resolution of a full circle.
pub fn bend_circular(library: &Library, params: &Params) -> Result<Component> {
    let radius = positive("radius", params.f64("radius")?)?;
    let width = positive("width", params.f64("width")?)?;
    let angle = params.f64("angle")?;
    if !(angle > 0.0 && angle < 360.0) {
        return Err(LayoutError::InvalidParameter {
            parameter: "angle".to_string(),
            reason: format!("must lie in (0, 360), got {angle}"),
        });
    }
    if width >= 2.0 * radius {
        return Err(LayoutError::InvalidParameter {
            parameter: "width".to_string(),
            reason: format!("{width} does not fit a bend of radius {radius}"),
        });
    }
    let npoints = params.i64("npoints")?.max(4);
    let xs = params.str("cross_section")?;
    let layer = layer_for(xs)?;

    let center = Point::new(0.0, radius);
    let steps = ((npoints as f64) * angle / 360.0).ceil().max(2.0) as usize;
    let arc = |r: f64| -> Vec<Point> {
        (0..=steps)
            .map(|i| {
                let t = -90.0 + angle * i as f64 / steps as f64;
                Transform::new(center, t, false).apply(&Point::new(r, 0.0))
            })
            .collect()
    };

    let mut vertices = arc(radius + width / 2.0);
    vertices.extend(arc(radius - width / 2.0).into_iter().rev());

    let end = Transform::new(center, angle - 90.0, false).apply(&Point::new(radius, 0.0));

    let mut b = library.new_component("bend_circular");
    b.add_primitive(Polygon::new(layer, vertices));
    b.add_port(Port::new("o1", Point::origin(), 180.0, width).with_cross_section(xs))?;
    b.add_port(Port::new("o2", end, angle, width).with_cross_section(xs))?;
    Ok(b.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaplayout_core::GeomPrimitive;

    #[test]
    fn test_quarter_bend_ports() {
        let lib = Library::default();
        let c = bend_circular(&lib, &defaults()).unwrap();
        let o2 = c.port("o2").unwrap();
        assert_eq!(o2.position, Point::new(10.0, 10.0));
        assert_eq!(o2.orientation, 90.0);

        let bb = c.local_bbox().unwrap();
        assert!((bb.min.y + 0.25).abs() < 1e-9);
        assert!((bb.max.x - 10.25).abs() < 1e-9);
        match &c.primitives[0] {
            GeomPrimitive::Polygon(p) => assert_eq!(p.vertex_count(), 2 * (32 + 1)),
            other => panic!("expected a polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_angle() {
        let lib = Library::default();
        assert!(bend_circular(&lib, &defaults().with("angle", 0.0)).is_err());
        assert!(bend_circular(&lib, &defaults().with("width", 25.0)).is_err());
    }
}
