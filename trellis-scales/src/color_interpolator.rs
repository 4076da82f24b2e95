use std::fmt::Debug;
use std::sync::Arc;

use css_color_parser::Color;
use palette::{Hsla, IntoColor, Laba, Mix, Srgba};

use crate::error::TrellisScaleError;
use crate::options::InterpolateSpace;

pub trait ColorInterpolator: Debug + Send + Sync + 'static {
    /// Interpolate over evenly spaced colors at normalized position `t`
    fn interpolate(&self, colors: &[Srgba], t: f64) -> Srgba;
}

#[derive(Clone, Debug)]
pub struct SrgbaColorInterpolator;

impl ColorInterpolator for SrgbaColorInterpolator {
    fn interpolate(&self, colors: &[Srgba], t: f64) -> Srgba {
        interpolate_color(colors, t)
    }
}

#[derive(Clone, Debug)]
pub struct HslaColorInterpolator;

impl ColorInterpolator for HslaColorInterpolator {
    fn interpolate(&self, colors: &[Srgba], t: f64) -> Srgba {
        let hsla_colors: Vec<Hsla> = colors.iter().map(|c| (*c).into_color()).collect();
        interpolate_color(&hsla_colors, t)
    }
}

#[derive(Clone, Debug)]
pub struct LabaColorInterpolator;

impl ColorInterpolator for LabaColorInterpolator {
    fn interpolate(&self, colors: &[Srgba], t: f64) -> Srgba {
        let laba_colors: Vec<Laba> = colors.iter().map(|c| (*c).into_color()).collect();
        interpolate_color(&laba_colors, t)
    }
}

pub fn interpolator_for(space: InterpolateSpace) -> Arc<dyn ColorInterpolator> {
    match space {
        InterpolateSpace::Rgb => Arc::new(SrgbaColorInterpolator),
        InterpolateSpace::Hsl => Arc::new(HslaColorInterpolator),
        InterpolateSpace::Lab => Arc::new(LabaColorInterpolator),
    }
}

/// A color space that can be mixed with palette's `Mix` trait
pub trait ColorSpace:
    Mix<Scalar = f32> + Copy + IntoColor<Srgba> + Debug + Send + Sync + 'static
{
}

impl<T: Mix<Scalar = f32> + Copy + IntoColor<Srgba> + Debug + Send + Sync + 'static> ColorSpace
    for T
{
}

fn interpolate_color<C: ColorSpace>(colors: &[C], t: f64) -> Srgba {
    let Some(first) = colors.first() else {
        return Srgba::new(0.0, 0.0, 0.0, 0.0);
    };
    if colors.len() == 1 || t.is_nan() {
        return (*first).into_color();
    }
    let scale_factor = (colors.len() - 1) as f32;
    let continuous_index = (t as f32 * scale_factor).clamp(0.0, scale_factor);
    let lower_index = continuous_index.floor() as usize;
    let upper_index = continuous_index.ceil() as usize;

    if lower_index == upper_index {
        colors[lower_index].into_color()
    } else {
        let weight = continuous_index - lower_index as f32;
        colors[lower_index]
            .mix(colors[upper_index], weight)
            .into_color()
    }
}

/// Parse a CSS color string
pub fn parse_color(color: &str) -> Result<Srgba, TrellisScaleError> {
    let parsed = color
        .trim()
        .parse::<Color>()
        .map_err(|_| TrellisScaleError::InvalidColor(color.to_string()))?;
    Ok(Srgba::new(
        parsed.r as f32 / 255.0,
        parsed.g as f32 / 255.0,
        parsed.b as f32 / 255.0,
        parsed.a,
    ))
}

/// Format as `#rrggbb`, or `rgba(...)` when translucent
pub fn to_hex(color: Srgba) -> String {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    let (r, g, b) = (
        to_byte(color.color.red),
        to_byte(color.color.green),
        to_byte(color.color.blue),
    );
    if color.alpha >= 1.0 {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("rgba({r}, {g}, {b}, {})", color.alpha.clamp(0.0, 1.0))
    }
}
