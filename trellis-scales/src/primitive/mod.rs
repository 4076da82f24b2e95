//! Scale primitives: callable domain-to-range mappings.
//!
//! Every primitive exposes `ticks`, `invert` and `bandwidth`; primitives that have
//! no meaningful notion of one fall back to the trait's empty defaults.

use std::fmt::Debug;

use trellis_common::RawValue;

use crate::options::ScaleType;

pub mod band;
pub mod color_ramp;
pub mod constant;
pub mod continuous;
pub mod ordinal;
pub mod threshold;

pub use band::BandScale;
pub use color_ramp::{ColorNormalizer, ColorRampScale};
pub use constant::ConstantScale;
pub use continuous::{ContinuousScale, ContinuousTransform};
pub use ordinal::OrdinalScale;
pub use threshold::ThresholdScale;

pub trait ScalePrimitive: Debug + Send + Sync + 'static {
    fn scale_type(&self) -> ScaleType;

    /// Map a domain value to the range
    fn apply(&self, value: &RawValue) -> RawValue;

    fn domain(&self) -> Vec<RawValue>;

    fn range(&self) -> Vec<RawValue>;

    fn ticks(&self, _count: f64) -> Vec<RawValue> {
        vec![]
    }

    /// Map a range value back to the domain
    fn invert(&self, _value: f64) -> Option<RawValue> {
        None
    }

    fn bandwidth(&self) -> f64 {
        0.0
    }

    fn step(&self) -> f64 {
        0.0
    }
}

/// Piecewise linear interpolation of `x` over the breakpoints `xs` to `ys`.
/// `xs` may be ascending or descending; a zero-width segment maps to its midpoint.
pub(crate) fn piecewise(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if n == 1 {
        return ys[0];
    }
    let descending = xs[0] > xs[n - 1];
    let position = if descending {
        xs[..n].partition_point(|&v| v >= x)
    } else {
        xs[..n].partition_point(|&v| v <= x)
    };
    let i = position.clamp(1, n - 1) - 1;
    let (x0, x1) = (xs[i], xs[i + 1]);
    let (y0, y1) = (ys[i], ys[i + 1]);
    let span = x1 - x0;
    let u = if span == 0.0 { 0.5 } else { (x - x0) / span };
    y0 + u * (y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_piecewise() {
        assert_approx_eq!(f64, piecewise(&[0.0, 10.0], &[0.0, 100.0], 2.5), 25.0);
        assert_approx_eq!(f64, piecewise(&[0.0, 10.0], &[0.0, 100.0], 20.0), 200.0);
        assert_approx_eq!(f64, piecewise(&[-1.0, 0.0, 4.0], &[0.0, 0.5, 1.0], 2.0), 0.75);
        assert_approx_eq!(f64, piecewise(&[10.0, 0.0], &[0.0, 1.0], 2.5), 0.75);
        assert_approx_eq!(f64, piecewise(&[3.0, 3.0], &[0.0, 1.0], 3.0), 0.5);
    }
}
