use snaplayout_core::{Component, ComponentSpec, Library, Params, Result};

const NM: f64 = 1e-3;

pub fn defaults() -> Params {
    Params::new()
        .with("length", 4.0 * NM)
        .with("width", 4.0 * NM)
        .with("angle", 30.0)
        .with("straight", ComponentSpec::new("straight"))
}

/// Two straights at an arbitrary angle, placed as virtual instances.
///
/// The first is rotated by `angle`; the second continues from its end.
/// Both stay virtual until the component is flattened.
pub fn sample_all_angle(library: &Library, params: &Params) -> Result<Component> {
    let mut spec = params.spec("straight")?;
    spec.params.set("length", params.f64("length")?);
    spec.params.set("width", params.f64("width")?);
    let wg = library.get_component(&spec)?;

    let mut b = library.new_component("sample_all_angle");
    let w1 = b.create_virtual(&wg)?;
    b.rotate(w1, params.f64("angle")?)?;

    let w2 = b.create_virtual(&wg)?;
    b.connect(w2, "o1", w1, "o2")?;

    b.expose_port(w1, "o1", "o1")?;
    b.expose_port(w2, "o2", "o2")?;
    Ok(b.build())
}
