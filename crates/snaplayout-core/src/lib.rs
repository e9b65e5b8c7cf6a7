//! # SnapLayout Core
//!
//! Hierarchical 2D layout built from parametric components. Sub-components
//! are placed as instances and snapped together by their ports instead of
//! explicit coordinates. Components are memoized per factory parameters,
//! shared by id from a library arena, and flattened into plain geometry for
//! export.

pub mod builder;
pub mod component;
pub mod config;
pub mod error;
pub mod factory;
pub mod flatten;
pub mod geometry;
pub mod library;
pub mod params;
pub mod port;
pub mod resolver;
pub mod spatial;
pub mod transform;

pub use builder::{ComponentBuilder, InstanceHandle, Placement, VirtualHandle};
pub use component::{Component, ComponentId, Instance, VirtualInstance};
pub use config::{LayoutConfig, RotationPolicy};
pub use error::{LayoutError, PortMismatch, Result};
pub use factory::{FactoryCache, FactoryRegistry};
pub use flatten::{ComponentLookup, FlattenOptions};
pub use geometry::{BBox, GeomPrimitive, LayerId, Path, Point, Polygon, Rect};
pub use library::Library;
pub use params::{CacheKey, ComponentSpec, ParamValue, Params};
pub use port::{Port, PortType};
pub use resolver::{resolve, resolve_with, ConnectOptions};
pub use spatial::SpatialIndex;
pub use transform::Transform;
