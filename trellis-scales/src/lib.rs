pub mod array;
pub mod builder;
pub mod color;
pub mod color_interpolator;
pub mod error;
pub mod infer;
pub mod interval;
pub mod options;
pub mod predicates;
pub mod primitive;
pub mod scheme;

pub use builder::{compute_scales, create_scale, PlotScale};
pub use error::TrellisScaleError;
pub use interval::{Interval, TimeUnit};
pub use options::{Nice, PlotOptions, ScaleOptions, ScaleType, SchemeSpec};
pub use primitive::ScalePrimitive;
