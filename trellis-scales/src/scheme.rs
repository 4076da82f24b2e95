//! Named color schemes and sampling.

use std::str::FromStr;

use palette::Srgba;
use strum::{Display, EnumIter, EnumString};

use crate::color_interpolator::{parse_color, to_hex, ColorInterpolator, SrgbaColorInterpolator};
use crate::error::TrellisScaleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    /// Distinct swatches, cycled
    Categorical,
    /// Interpolated ramp
    Sequential,
    /// Interpolated ramp with a neutral midpoint
    Diverging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NamedScheme {
    Observable10,
    Tableau10,
    Category10,
    Blues,
    Greens,
    Reds,
    Viridis,
    Turbo,
    Rdbu,
    Piyg,
    Brbg,
    Rdylbu,
}

const OBSERVABLE10: &[&str] = &[
    "#4269d0", "#efb118", "#ff725c", "#6cc5b0", "#3ca951", "#ff8ab7", "#a463f2", "#97bbf5",
    "#9c6b4e", "#9498a0",
];
const TABLEAU10: &[&str] = &[
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];
const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];
const BLUES: &[&str] = &[
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];
const GREENS: &[&str] = &[
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c",
    "#00441b",
];
const REDS: &[&str] = &[
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15",
    "#67000d",
];
const VIRIDIS: &[&str] = &[
    "#440154", "#482475", "#414487", "#355f8d", "#2a788e", "#21918c", "#22a884", "#44bf70",
    "#7ad151", "#bddf26", "#fde725",
];
const TURBO: &[&str] = &[
    "#23171b", "#4a58dd", "#2f9df5", "#27d7c4", "#4df884", "#95fb51", "#dedd32", "#ffa423",
    "#f65f18", "#ba2208", "#900c00",
];
const RDBU: &[&str] = &[
    "#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7", "#f7f7f7", "#d1e5f0", "#92c5de",
    "#4393c3", "#2166ac", "#053061",
];
const PIYG: &[&str] = &[
    "#8e0152", "#c51b7d", "#de77ae", "#f1b6da", "#fde0ef", "#f7f7f7", "#e6f5d0", "#b8e186",
    "#7fbc41", "#4d9221", "#276419",
];
const BRBG: &[&str] = &[
    "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#f5f5f5", "#c7eae5", "#80cdc1",
    "#35978f", "#01665e", "#003c30",
];
const RDYLBU: &[&str] = &[
    "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee090", "#ffffbf", "#e0f3f8", "#abd9e9",
    "#74add1", "#4575b4", "#313695",
];

impl NamedScheme {
    pub fn kind(&self) -> SchemeKind {
        match self {
            NamedScheme::Observable10 | NamedScheme::Tableau10 | NamedScheme::Category10 => {
                SchemeKind::Categorical
            }
            NamedScheme::Blues
            | NamedScheme::Greens
            | NamedScheme::Reds
            | NamedScheme::Viridis
            | NamedScheme::Turbo => SchemeKind::Sequential,
            NamedScheme::Rdbu | NamedScheme::Piyg | NamedScheme::Brbg | NamedScheme::Rdylbu => {
                SchemeKind::Diverging
            }
        }
    }

    pub fn stops(&self) -> &'static [&'static str] {
        match self {
            NamedScheme::Observable10 => OBSERVABLE10,
            NamedScheme::Tableau10 => TABLEAU10,
            NamedScheme::Category10 => CATEGORY10,
            NamedScheme::Blues => BLUES,
            NamedScheme::Greens => GREENS,
            NamedScheme::Reds => REDS,
            NamedScheme::Viridis => VIRIDIS,
            NamedScheme::Turbo => TURBO,
            NamedScheme::Rdbu => RDBU,
            NamedScheme::Piyg => PIYG,
            NamedScheme::Brbg => BRBG,
            NamedScheme::Rdylbu => RDYLBU,
        }
    }
}

/// A parsed set of scheme colors
#[derive(Debug, Clone)]
pub struct Scheme {
    kind: SchemeKind,
    colors: Vec<Srgba>,
}

impl Scheme {
    pub fn named(name: &str) -> Result<Self, TrellisScaleError> {
        let named = NamedScheme::from_str(name)
            .map_err(|_| TrellisScaleError::UnknownScheme(name.to_string()))?;
        Ok(Self::from(named))
    }

    /// A scheme from user colors
    pub fn from_colors(colors: &[String], kind: SchemeKind) -> Result<Self, TrellisScaleError> {
        if colors.is_empty() {
            return Err(TrellisScaleError::UnknownScheme("empty color list".to_string()));
        }
        let colors = colors
            .iter()
            .map(|c| parse_color(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { kind, colors })
    }

    pub fn kind(&self) -> SchemeKind {
        self.kind
    }

    pub fn colors(&self) -> &[Srgba] {
        &self.colors
    }

    /// Color at normalized position `t` along the ramp
    pub fn interpolate(&self, t: f64, interpolator: &dyn ColorInterpolator) -> String {
        to_hex(interpolator.interpolate(&self.colors, t))
    }

    /// `n` swatches. Categorical schemes cycle their colors; ramps are sampled at
    /// evenly spaced positions.
    pub fn sample(&self, n: usize) -> Vec<String> {
        match self.kind {
            SchemeKind::Categorical => self
                .colors
                .iter()
                .cycle()
                .take(n)
                .map(|c| to_hex(*c))
                .collect(),
            SchemeKind::Sequential | SchemeKind::Diverging => {
                let interpolator = SrgbaColorInterpolator;
                (0..n)
                    .map(|i| {
                        let t = if n > 1 {
                            i as f64 / (n - 1) as f64
                        } else {
                            0.5
                        };
                        self.interpolate(t, &interpolator)
                    })
                    .collect()
            }
        }
    }
}

impl From<NamedScheme> for Scheme {
    fn from(value: NamedScheme) -> Self {
        // Scheme stops are static hex strings
        let colors = value
            .stops()
            .iter()
            .filter_map(|c| parse_color(c).ok())
            .collect();
        Self {
            kind: value.kind(),
            colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_stops_parse() {
        for scheme in NamedScheme::iter() {
            assert_eq!(Scheme::from(scheme).colors().len(), scheme.stops().len());
        }
    }

    #[test]
    fn test_named_lookup() {
        assert_eq!(NamedScheme::from_str("RdBu"), Ok(NamedScheme::Rdbu));
        assert!(matches!(
            Scheme::named("plasma-ish"),
            Err(TrellisScaleError::UnknownScheme(_))
        ));
    }

    #[test]
    fn test_sample_categorical_cycles() -> Result<(), TrellisScaleError> {
        let swatches = Scheme::named("category10")?.sample(12);
        assert_eq!(swatches.len(), 12);
        assert_eq!(swatches[0], "#1f77b4");
        assert_eq!(swatches[10], "#1f77b4");
        Ok(())
    }

    #[test]
    fn test_sample_ramp_endpoints() -> Result<(), TrellisScaleError> {
        let swatches = Scheme::named("blues")?.sample(3);
        assert_eq!(swatches.len(), 3);
        assert_eq!(swatches[0], "#f7fbff");
        assert_eq!(swatches[1], "#6baed6");
        assert_eq!(swatches[2], "#08306b");
        Ok(())
    }
}
