use snaplayout_core::{Component, ComponentSpec, FlattenOptions, Library, Params, Result};

/// Default straight length of the CD-SEM lines, in microns.
pub const LINE_LENGTH: f64 = 420.0;

pub fn defaults() -> Params {
    Params::new()
        .with("width", 0.5)
        .with("radius", 10.0)
        .with("wg_length", LINE_LENGTH)
        .with("straight", ComponentSpec::new("straight"))
        .with("bend90", ComponentSpec::new("bend_circular"))
        .with("cross_section", "strip")
}

fn sized(mut spec: ComponentSpec, params: &[(&str, snaplayout_core::ParamValue)]) -> ComponentSpec {
    for (name, value) in params {
        spec.params.set(name, value.clone());
    }
    spec
}

/// CD-SEM test structure: a U-turn of two bends feeding two long straights,
/// turned upright and flattened.
///
/// An unset `wg_length` makes the straights as long as the U-turn is wide.
pub fn cdsem_bend180(library: &Library, params: &Params) -> Result<Component> {
    let width = params.f64("width")?;
    let radius = params.f64("radius")?;
    let wg_length = params.opt_f64("wg_length")?.unwrap_or(2.0 * radius);
    let xs = params.str("cross_section")?;

    let bend90 = library.get_component(&sized(
        params.spec("bend90")?,
        &[
            ("cross_section", xs.into()),
            ("radius", radius.into()),
            ("width", width.into()),
        ],
    ))?;
    let wg = library.get_component(&sized(
        params.spec("straight")?,
        &[
            ("cross_section", xs.into()),
            ("length", wg_length.into()),
            ("width", width.into()),
        ],
    ))?;

    let mut u = library.new_component("cdsem_bend180_u");
    let b1 = u.add_ref(&bend90)?;
    let b2 = u.add_ref(&bend90)?;
    u.connect(b2, "o2", b1, "o1")?;

    let wg1 = u.add_ref(&wg)?;
    u.connect(wg1, "o1", b1, "o2")?;

    let wg2 = u.add_ref(&wg)?;
    u.connect(wg2, "o1", b2, "o1")?;
    let turn = u.finish();
    log::debug!("u-turn '{}' placed with {} instances", turn.name, turn.instances.len());

    let mut upright = library.new_component("cdsem_bend180");
    let placed = upright.add_ref(&turn)?;
    upright.rotate(placed, 90.0)?;
    library.flatten(&upright.build(), FlattenOptions::default())
}
