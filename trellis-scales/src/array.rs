//! Numeric array helpers: tick generation, nicing, extents and order statistics.

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = 1.4142135623730951; // sqrt(2)

/// Generate approximately count ticks within the given range
pub fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || start.is_nan() || stop.is_nan() {
        return vec![];
    }
    if start == stop {
        return vec![start];
    }

    let reverse = stop < start;
    let (i1, i2, inc) = if reverse {
        tick_spec(stop, start, count)
    } else {
        tick_spec(start, stop, count)
    };

    if !(i2 >= i1) {
        return vec![];
    }

    let n = (i2 - i1 + 1.0) as usize;
    let mut ticks = Vec::with_capacity(n);
    for i in 0..n {
        let k = if reverse { i2 - i as f64 } else { i1 + i as f64 };
        if inc < 0.0 {
            ticks.push(k / -inc);
        } else {
            ticks.push(k * inc);
        }
    }
    ticks
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10.0_f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let temp_inc = 10.0_f64.powf(-power) / factor;
        i1 = (start * temp_inc).round();
        i2 = (stop * temp_inc).round();
        if i1 / temp_inc < start {
            i1 += 1.0;
        }
        if i2 / temp_inc > stop {
            i2 -= 1.0;
        }
        inc = -temp_inc;
    } else {
        inc = 10.0_f64.powf(power) * factor;
        i1 = (start / inc).round();
        i2 = (stop / inc).round();
        if i1 * inc < start {
            i1 += 1.0;
        }
        if i2 * inc > stop {
            i2 -= 1.0;
        }
    }

    if i2 < i1 && 0.5 <= count && count < 2.0 {
        return tick_spec(start, stop, count * 2.0);
    }

    (i1, i2, inc)
}

/// Calculate the tick increment for the given range and count. Negative results
/// encode the reciprocal of a fractional step.
pub fn tick_increment(start: f64, stop: f64, count: f64) -> f64 {
    if !(count > 0.0) {
        return f64::NAN;
    }
    if start == stop {
        return f64::NEG_INFINITY;
    }

    let step = (stop - start) / count.max(0.0);
    if step == 0.0 {
        return f64::NAN;
    }

    let power = step.log10().floor();
    let error = step / 10.0_f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        10.0_f64.powf(power) * factor
    } else {
        -10.0_f64.powf(-power) / factor
    }
}

/// Absolute tick step, signed by the direction of the range
pub fn tick_step(start: f64, stop: f64, count: f64) -> f64 {
    let reverse = stop < start;
    let inc = if reverse {
        tick_increment(stop, start, count)
    } else {
        tick_increment(start, stop, count)
    };
    let step = if inc < 0.0 { 1.0 / -inc } else { inc };
    if reverse {
        -step
    } else {
        step
    }
}

/// Extend `[start, stop]` to round values aligned with the tick step
pub fn nice(start: f64, stop: f64, count: f64) -> (f64, f64) {
    if !(start.is_finite() && stop.is_finite()) || start == stop {
        return (start, stop);
    }
    let (mut lo, mut hi) = if start <= stop {
        (start, stop)
    } else {
        (stop, start)
    };

    let mut prestep = f64::NAN;
    for _ in 0..10 {
        let step = tick_increment(lo, hi, count);
        if step == prestep {
            break;
        } else if step > 0.0 {
            lo = (lo / step).floor() * step;
            hi = (hi / step).ceil() * step;
        } else if step < 0.0 {
            lo = (lo * step).ceil() / step;
            hi = (hi * step).floor() / step;
        } else {
            break;
        }
        prestep = step;
    }

    if start <= stop {
        (lo, hi)
    } else {
        (hi, lo)
    }
}

/// Minimum and maximum of the finite values
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| v.is_finite()).sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// Sample variance (n - 1 denominator), computed with Welford's algorithm
pub fn variance(values: &[f64]) -> Option<f64> {
    let mut count = 0.0;
    let mut mean = 0.0;
    let mut sum = 0.0;
    for &v in values.iter().filter(|v| v.is_finite()) {
        count += 1.0;
        let delta = v - mean;
        mean += delta / count;
        sum += delta * (v - mean);
    }
    if count > 1.0 {
        Some(sum / (count - 1.0))
    } else {
        None
    }
}

pub fn deviation(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Finite values sorted ascending
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile `p` of ascending-sorted values, interpolating between order statistics
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || p.is_nan() {
        return None;
    }
    if p <= 0.0 || n < 2 {
        return Some(sorted[0]);
    }
    if p >= 1.0 {
        return Some(sorted[n - 1]);
    }
    let i = (n - 1) as f64 * p;
    let i0 = i.floor() as usize;
    let v0 = sorted[i0];
    let v1 = sorted[i0 + 1];
    Some(v0 + (v1 - v0) * (i - i0 as f64))
}

pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    quantile_sorted(&sorted_finite(values), p)
}

/// Index of the first element greater than `x`
pub fn bisect_right(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|&v| v <= x)
}
