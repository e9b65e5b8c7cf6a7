use snaplayout_core::{Component, Library, Params, Point, Port, Rect, Result};

use crate::cross_section::{layer_for, positive};

pub fn defaults() -> Params {
    Params::new()
        .with("length", 10.0)
        .with("width", 0.5)
        .with("cross_section", "strip")
}

/// A straight waveguide along +x.
///
/// `o1` sits at the origin facing west, `o2` at `(length, 0)` facing east.
pub fn straight(library: &Library, params: &Params) -> Result<Component> {
    let length = positive("length", params.f64("length")?)?;
    let width = positive("width", params.f64("width")?)?;
    let xs = params.str("cross_section")?;
    let layer = layer_for(xs)?;

    let mut b = library.new_component("straight");
    b.add_primitive(Rect::new(layer, 0.0, -width / 2.0, length, width / 2.0));
    b.add_port(Port::new("o1", Point::origin(), 180.0, width).with_cross_section(xs))?;
    b.add_port(Port::new("o2", Point::new(length, 0.0), 0.0, width).with_cross_section(xs))?;
    Ok(b.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaplayout_core::{GeomPrimitive, LayoutError};

    #[test]
    fn test_straight_geometry() {
        let lib = Library::default();
        let c = straight(&lib, &defaults().with("length", 4.0)).unwrap();
        assert_eq!(
            c.primitives,
            vec![GeomPrimitive::Rect(Rect::new(1, 0.0, -0.25, 4.0, 0.25))]
        );
        assert_eq!(c.port("o2").unwrap().position, Point::new(4.0, 0.0));
        assert_eq!(c.port("o1").unwrap().cross_section.as_deref(), Some("strip"));
    }

    #[test]
    fn test_zero_width_rejected() {
        let lib = Library::default();
        assert!(matches!(
            straight(&lib, &defaults().with("width", 0.0)),
            Err(LayoutError::InvalidParameter { .. })
        ));
    }
}
