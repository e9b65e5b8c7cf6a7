use snaplayout_core::{
    Component, LayoutError, Library, Params, Point, Port, PortType, Rect, Result,
};

use crate::cross_section::positive;

pub fn defaults() -> Params {
    Params::new()
        .with("size_x", 4.0)
        .with("size_y", 2.0)
        .with("layer", 41)
        .with("centered", false)
}

/// A single rectangle with an electrical port on each edge midpoint,
/// `e1` to `e4` counter-clockwise from the west edge.
pub fn rectangle(library: &Library, params: &Params) -> Result<Component> {
    let sx = positive("size_x", params.f64("size_x")?)?;
    let sy = positive("size_y", params.f64("size_y")?)?;
    let layer = u32::try_from(params.i64("layer")?).map_err(|e| LayoutError::InvalidParameter {
        parameter: "layer".to_string(),
        reason: e.to_string(),
    })?;
    let (x0, y0) = if params.bool("centered")? {
        (-sx / 2.0, -sy / 2.0)
    } else {
        (0.0, 0.0)
    };
    let (x1, y1) = (x0 + sx, y0 + sy);
    let (xm, ym) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);

    let mut b = library.new_component("rectangle");
    b.add_primitive(Rect::new(layer, x0, y0, x1, y1));
    for (name, position, orientation, width) in [
        ("e1", Point::new(x0, ym), 180.0, sy),
        ("e2", Point::new(xm, y1), 90.0, sx),
        ("e3", Point::new(x1, ym), 0.0, sy),
        ("e4", Point::new(xm, y0), 270.0, sx),
    ] {
        b.add_port(Port::new(name, position, orientation, width).with_type(PortType::Electrical))?;
    }
    Ok(b.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rectangle() {
        let lib = Library::default();
        let c = rectangle(&lib, &defaults().with("centered", true)).unwrap();
        let bb = c.local_bbox().unwrap();
        assert_eq!(bb.center(), Point::origin());
        assert_eq!(c.ports.len(), 4);
        assert_eq!(c.port("e3").unwrap().position, Point::new(2.0, 0.0));
        assert_eq!(c.port("e2").unwrap().width, 4.0);
    }

    #[test]
    fn test_negative_layer() {
        let lib = Library::default();
        assert!(rectangle(&lib, &defaults().with("layer", -1)).is_err());
    }
}
