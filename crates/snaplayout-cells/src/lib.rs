//! # SnapLayout Cells
//!
//! Parametric cells and the factory registry that resolves them by name.
//! Every cell here is a plain function from parameters to a component; the
//! library's cache makes repeated requests share one built component.

pub mod all_angle;
pub mod bend;
pub mod cdsem;
pub mod cross_section;
pub mod rectangle;
pub mod straight;

use snaplayout_core::{FactoryRegistry, LayoutConfig, Library, Result};

/// Registry holding every cell in this crate.
pub fn registry() -> Result<FactoryRegistry> {
    let mut reg = FactoryRegistry::new();
    reg.register("straight", straight::defaults(), straight::straight)?;
    reg.register("bend_circular", bend::defaults(), bend::bend_circular)?;
    reg.register("rectangle", rectangle::defaults(), rectangle::rectangle)?;
    reg.register("cdsem_bend180", cdsem::defaults(), cdsem::cdsem_bend180)?;
    reg.register(
        "sample_all_angle",
        all_angle::defaults(),
        all_angle::sample_all_angle,
    )?;
    Ok(reg)
}

/// A library that can build every cell in this crate.
pub fn library() -> Result<Library> {
    library_with_config(LayoutConfig::default())
}

pub fn library_with_config(config: LayoutConfig) -> Result<Library> {
    Ok(Library::with_config(registry()?, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let reg = registry().unwrap();
        assert_eq!(
            reg.ids(),
            vec![
                "bend_circular",
                "cdsem_bend180",
                "rectangle",
                "sample_all_angle",
                "straight"
            ]
        );
    }
}
