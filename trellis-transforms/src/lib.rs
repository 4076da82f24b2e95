pub mod bin;
pub mod core;
pub mod density;
pub mod dodge;
pub mod error;
pub mod facet;
pub mod filter;
pub mod group;
pub mod mosaic;
pub mod normalize;
pub mod reducer;
pub mod regression;
pub mod sort;
pub mod stack;

pub use crate::core::{apply_transforms, ChannelUpdate, Transform, TransformArgs};
pub use bin::{Bin, BinOptions, Thresholds};
pub use density::{Bandwidth, Density, Kernel};
pub use dodge::{Dodge, DodgeAnchor};
pub use error::TrellisTransformError;
pub use filter::Filter;
pub use group::Group;
pub use mosaic::StackMosaic;
pub use normalize::{Normalize, NormalizeBasis};
pub use reducer::{Reducer, ReducerName};
pub use regression::{fit_regression, Regression, RegressionFit};
pub use sort::Sort;
pub use stack::{Stack, StackOffset, StackOrder};
