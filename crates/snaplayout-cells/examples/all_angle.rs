//! Build the all-angle sample, flatten it, and print the result as JSON.
//!
//! Run with `RUST_LOG=debug` to see cache and connection activity.

use env_logger::Env;
use snaplayout_core::{FlattenOptions, Params};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let lib = snaplayout_cells::library()?;
    let sample = lib.build_component(
        "sample_all_angle",
        &Params::new().with("angle", 30.0).with("length", 4.0),
    )?;
    let flat = lib.flatten(&sample, FlattenOptions::with_ports())?;

    log::info!(
        "{}: {} primitives, bbox {:?}",
        flat.name,
        flat.primitives.len(),
        flat.local_bbox()
    );
    println!("{}", serde_json::to_string_pretty(&flat)?);
    Ok(())
}
