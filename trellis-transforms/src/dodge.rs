//! Dodge transform: packs circles along one axis so that none overlap.
//!
//! Circles are placed one at a time. For each circle, the previously placed
//! circles whose extent along the fixed axis overlaps its own are found with an
//! R-tree; every offset that makes the new circle tangent to one of them
//! is a candidate, and the candidate closest to the baseline that intersects no
//! neighbor wins.

use std::sync::Arc;

use indexmap::IndexMap;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use trellis_common::{Channel, InternalKey, ScaleName};
use trellis_scales::{PlotOptions, PlotScale};

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::facet_groups;

const EPSILON: f64 = 1e-6;
const DEFAULT_RADIUS: f64 = 3.0;
const DEFAULT_PADDING: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DodgeAnchor {
    Left,
    Right,
    Top,
    Bottom,
    Middle,
}

/// Extent of a placed circle along the fixed axis. The second axis is
/// degenerate so envelope intersection reduces to interval overlap.
#[derive(Debug, Clone, Copy)]
struct PlacedCircle {
    index: usize,
    lo: f64,
    hi: f64,
}

impl RTreeObject for PlacedCircle {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.lo, 0.0], [self.hi, 0.0])
    }
}

/// Indices of the placed circles whose extent intersects [lo, hi]
fn overlapping(tree: &RTree<PlacedCircle>, lo: f64, hi: f64) -> Vec<usize> {
    tree.locate_in_envelope_intersecting(&AABB::from_corners([lo, 0.0], [hi, 0.0]))
        .map(|circle| circle.index)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Dodge {
    /// The channel being computed
    channel: Channel,
    /// The fixed channel circles are spread along
    along: Channel,
    anchor: DodgeAnchor,
    padding: f64,
    r: f64,
    layout: PlotOptions,
    scales: Option<Arc<IndexMap<ScaleName, PlotScale>>>,
}

impl Dodge {
    /// Compute x positions for circles placed along y. Anchors: left, right, middle.
    pub fn x(anchor: DodgeAnchor) -> Self {
        Self::new(Channel::X, Channel::Y, anchor)
    }

    /// Compute y positions for circles placed along x. Anchors: top, bottom, middle.
    pub fn y(anchor: DodgeAnchor) -> Self {
        Self::new(Channel::Y, Channel::X, anchor)
    }

    fn new(channel: Channel, along: Channel, anchor: DodgeAnchor) -> Self {
        Self {
            channel,
            along,
            anchor,
            padding: DEFAULT_PADDING,
            r: DEFAULT_RADIUS,
            layout: PlotOptions::default(),
            scales: None,
        }
    }

    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Radius used when the mark has no `r` channel
    pub fn r(mut self, r: f64) -> Self {
        self.r = r;
        self
    }

    /// Plot dimensions that place the baseline
    pub fn layout(mut self, layout: PlotOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Scales used to project positions and radii into pixels before packing
    pub fn scales(mut self, scales: Arc<IndexMap<ScaleName, PlotScale>>) -> Self {
        self.scales = Some(scales);
        self
    }

    /// Packing direction and baseline pixel position
    fn baseline(&self) -> Result<(f64, f64), TrellisTransformError> {
        let l = &self.layout;
        let horizontal = self.channel == Channel::X;
        match (self.anchor, horizontal) {
            (DodgeAnchor::Left, true) => Ok((1.0, l.margin_left)),
            (DodgeAnchor::Right, true) => Ok((-1.0, l.width - l.margin_right)),
            (DodgeAnchor::Middle, true) => {
                Ok((0.0, (l.margin_left + l.width - l.margin_right) / 2.0))
            }
            (DodgeAnchor::Top, false) => Ok((1.0, l.margin_top)),
            (DodgeAnchor::Bottom, false) => Ok((-1.0, l.height - l.margin_bottom)),
            (DodgeAnchor::Middle, false) => {
                Ok((0.0, (l.margin_top + l.height - l.margin_bottom) / 2.0))
            }
            (anchor, _) => Err(TrellisTransformError::InvalidOption(format!(
                "anchor `{anchor}` cannot be used to dodge along {}",
                self.channel
            ))),
        }
    }

    fn scale(&self, name: ScaleName) -> Option<&PlotScale> {
        self.scales
            .as_ref()
            .and_then(|scales| scales.get(&name))
            .filter(|scale| !scale.is_dummy)
    }

    fn project(
        &self,
        args: &TransformArgs,
        channel: &Channel,
    ) -> Result<Vec<f64>, TrellisTransformError> {
        let values = args.resolve(channel)?;
        Ok(match channel.scale().and_then(|name| self.scale(name)) {
            Some(scale) => values
                .iter()
                .map(|v| scale.apply(v).as_finite().unwrap_or(f64::NAN))
                .collect(),
            None => values
                .iter()
                .map(|v| v.as_finite().unwrap_or(f64::NAN))
                .collect(),
        })
    }
}

/// Pack one facet's circles. `positions` are along the fixed axis; the returned
/// offsets are relative to the baseline in packing direction `ky`.
fn pack(
    order: &[usize],
    positions: &[f64],
    radii: &[f64],
    padding: f64,
    ky: f64,
    offsets: &mut [f64],
) {
    let mut tree = RTree::new();
    for &i in order {
        let ri = radii[i];
        // offset baseline for varying radius
        let y0 = if ky == 0.0 { 0.0 } else { ri + padding };
        let (l, h) = (positions[i] - ri, positions[i] + ri);

        // the baseline itself is always a candidate
        let mut intervals = vec![0.0, 0.0];
        for j in overlapping(&tree, l - padding, h + padding) {
            let yj = offsets[j] - y0;
            let dx = positions[i] - positions[j];
            let dr = padding + ri + radii[j];
            let dy = (dr * dr - dx * dx).sqrt();
            intervals.push(yj - dy);
            intervals.push(yj + dy);
        }

        let mut candidates: Vec<f64> = intervals
            .iter()
            .copied()
            .filter(|y| y.is_finite() && (ky == 0.0 || *y >= 0.0))
            .collect();
        if ky == 0.0 {
            candidates.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
        } else {
            candidates.sort_by(f64::total_cmp);
        }

        let blocked = |y: f64| {
            intervals
                .chunks(2)
                .any(|pair| pair[0] + EPSILON < y && y < pair[1] - EPSILON)
        };
        if let Some(y) = candidates.into_iter().find(|y| !blocked(*y)) {
            offsets[i] = y + y0;
        }
        tree.insert(PlacedCircle {
            index: i,
            lo: l,
            hi: h,
        });
    }
}

impl Transform for Dodge {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let (ky, ty) = self.baseline()?;
        let positions = self.project(&args, &self.along)?;
        let radii = if args.has_channel(&Channel::R) {
            Some(self.project(&args, &Channel::R)?)
        } else {
            None
        };
        let radius = |i: usize| radii.as_ref().map(|r| r[i]).unwrap_or(self.r);

        let n = args.data.len();
        let all_radii: Vec<f64> = (0..n).map(radius).collect();
        let mut offsets = vec![0.0; n];
        let mut placed = vec![false; n];

        for indices in facet_groups(&args)?.into_values() {
            let mut order: Vec<usize> = indices
                .into_iter()
                .filter(|&i| positions[i].is_finite() && all_radii[i] > 0.0)
                .collect();
            // larger circles first
            if radii.is_some() {
                order.sort_by(|&a, &b| all_radii[b].total_cmp(&all_radii[a]));
            }
            pack(&order, &positions, &all_radii, self.padding, ky, &mut offsets);
            for i in order {
                placed[i] = true;
            }
        }

        let direction = if ky == 0.0 { 1.0 } else { ky };
        let key = InternalKey::new("dodge");
        let data = args
            .data
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let value = if placed[i] {
                    offsets[i] * direction + ty
                } else {
                    f64::NAN
                };
                record.derive(i).with_field(key, value)
            })
            .collect();

        Ok(TransformArgs {
            data,
            channels: ChannelUpdate::from_channels(&args.channels)
                .unscaled_column(self.channel.clone(), key)
                .finish(),
            sorted: args.sorted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_extents() {
        let mut tree = RTree::new();
        for (index, lo, hi) in [(0, 0.0, 2.0), (1, 5.0, 6.0), (2, 1.5, 3.0), (3, -4.0, -3.0)] {
            tree.insert(PlacedCircle { index, lo, hi });
        }
        let mut hits = overlapping(&tree, 1.8, 5.0);
        hits.sort();
        assert_eq!(hits, vec![0, 1, 2]);
        // touching endpoints count as overlap
        assert_eq!(overlapping(&tree, -3.0, -2.0), vec![3]);
        assert!(overlapping(&tree, 3.5, 4.5).is_empty());
    }

    #[test]
    fn test_pack_two_identical_circles() {
        let positions = [10.0, 10.0];
        let radii = [3.0, 3.0];
        let mut offsets = [0.0, 0.0];
        pack(&[0, 1], &positions, &radii, 1.0, 1.0, &mut offsets);
        assert_eq!(offsets[0], 4.0);
        // stacked on top of the first: centers 7 apart
        assert_eq!(offsets[1], 11.0);
    }

    #[test]
    fn test_mismatched_anchor() {
        let dodge = Dodge::y(DodgeAnchor::Left);
        assert!(matches!(
            dodge.baseline(),
            Err(TrellisTransformError::InvalidOption(_))
        ));
        assert_eq!(Dodge::y(DodgeAnchor::Bottom).baseline().unwrap(), (-1.0, 370.0));
        assert_eq!(Dodge::x(DodgeAnchor::Middle).baseline().unwrap(), (0.0, 330.0));
    }
}
