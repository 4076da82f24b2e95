//! Least-squares polynomial regression, emitted as a sampled curve per group.

use trellis_common::{Channel, InternalKey};
use trellis_scales::array;

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::facet_series_groups;

const DEFAULT_SAMPLES: usize = 40;
const PIVOT_EPSILON: f64 = 1e-12;

/// A fitted polynomial. Coefficients apply to the mean-centered independent
/// variable, which keeps the normal equations well conditioned at higher orders.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionFit {
    coefficients: Vec<f64>,
    x_mean: f64,
    y_mean: f64,
    r_squared: f64,
}

impl RegressionFit {
    pub fn predict(&self, x: f64) -> f64 {
        let u = x - self.x_mean;
        // Horner
        self.y_mean
            + self
                .coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, c| acc * u + c)
    }

    /// Coefficient of determination
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Fit a polynomial of `order` to the finite (x, y) pairs. Returns `None` when
/// there are too few distinct points to determine the coefficients.
pub fn fit_regression(xs: &[f64], ys: &[f64], order: usize) -> Option<RegressionFit> {
    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (*x, *y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if points.len() <= order {
        return None;
    }
    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let terms = order + 1;
    let mut a = vec![vec![0.0; terms]; terms];
    let mut b = vec![0.0; terms];
    for &(x, y) in &points {
        let (u, v) = (x - x_mean, y - y_mean);
        let powers: Vec<f64> = (0..2 * terms).map(|k| u.powi(k as i32)).collect();
        for j in 0..terms {
            for k in 0..terms {
                a[j][k] += powers[j + k];
            }
            b[j] += v * powers[j];
        }
    }
    let coefficients = solve(a, b)?;

    let mut fit = RegressionFit {
        coefficients,
        x_mean,
        y_mean,
        r_squared: 1.0,
    };
    let sst: f64 = points.iter().map(|(_, y)| (y - y_mean).powi(2)).sum();
    let sse: f64 = points.iter().map(|(x, y)| (y - fit.predict(*x)).powi(2)).sum();
    if sst > 0.0 {
        fit.r_squared = 1.0 - sse / sst;
    }
    Some(fit)
}

#[derive(Debug, Clone)]
pub struct Regression {
    independent: Channel,
    dependent: Channel,
    order: usize,
    samples: usize,
}

impl Regression {
    /// Fit y as a function of x (linear by default)
    pub fn y() -> Self {
        Self {
            independent: Channel::X,
            dependent: Channel::Y,
            order: 1,
            samples: DEFAULT_SAMPLES,
        }
    }

    /// Fit x as a function of y (linear by default)
    pub fn x() -> Self {
        Self {
            independent: Channel::Y,
            dependent: Channel::X,
            order: 1,
            samples: DEFAULT_SAMPLES,
        }
    }

    /// Polynomial order: 1 linear, 2 quadratic, and so on
    pub fn order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Number of evaluation points across each group's extent
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(2);
        self
    }
}

impl Transform for Regression {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        if self.order == 0 {
            return Err(TrellisTransformError::InvalidOption(
                "regression order must be at least 1".to_string(),
            ));
        }
        args.require("regression", self.independent.clone())?;
        args.require("regression", self.dependent.clone())?;
        let xs = args.resolve_numbers(&self.independent)?;
        let ys = args.resolve_numbers(&self.dependent)?;

        let x_key = InternalKey::new("regression_x");
        let y_key = InternalKey::new("regression_y");
        let mut data = Vec::new();
        for group in facet_series_groups(&args, &[])? {
            let gx: Vec<f64> = group.iter().map(|&i| xs[i]).collect();
            let gy: Vec<f64> = group.iter().map(|&i| ys[i]).collect();
            let (Some(fit), Some((lo, hi))) = (
                fit_regression(&gx, &gy, self.order),
                array::extent(gx.iter().copied()),
            ) else {
                log::debug!("skipping regression for a group of {} records", group.len());
                continue;
            };
            let first = group[0];
            let step = (hi - lo) / (self.samples - 1) as f64;
            data.extend((0..self.samples).map(|k| {
                let x = if k + 1 == self.samples { hi } else { lo + k as f64 * step };
                args.data[first]
                    .derive(first)
                    .with_field(x_key, x)
                    .with_field(y_key, fit.predict(x))
            }));
        }

        Ok(TransformArgs {
            data,
            channels: ChannelUpdate::from_channels(&args.channels)
                .column(self.independent.clone(), x_key)
                .column(self.dependent.clone(), y_key)
                .finish(),
            sorted: args.sorted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_linear_fit() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let fit = fit_regression(&xs, &ys, 1).unwrap();
        assert_approx_eq!(f64, fit.predict(10.0), 21.0, epsilon = 1e-9);
        assert_approx_eq!(f64, fit.r_squared(), 1.0);
    }

    #[test]
    fn test_quadratic_fit() {
        let xs: Vec<f64> = (0..6).map(|x| x as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x * x - x + 3.0).collect();
        let fit = fit_regression(&xs, &ys, 2).unwrap();
        assert_approx_eq!(f64, fit.predict(-2.0), 13.0, epsilon = 1e-8);
    }

    #[test]
    fn test_noisy_r_squared() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 2.0];
        let fit = fit_regression(&xs, &ys, 1).unwrap();
        // slope 0.5, residuals -0.5, 1, -0.5
        assert_approx_eq!(f64, fit.r_squared(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(fit_regression(&[1.0], &[2.0], 1).is_none());
        assert!(fit_regression(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], 1).is_none());
        assert!(fit_regression(&[1.0, f64::NAN], &[2.0, 3.0], 1).is_none());
    }
}
