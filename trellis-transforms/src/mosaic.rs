//! Mosaic (Marimekko) stacking: an outer stack of category totals along one axis,
//! each column split by an inner stack along the other.

use indexmap::{IndexMap, IndexSet};
use trellis_common::{Channel, InternalKey, RawValue};

use crate::core::{ChannelUpdate, Transform, TransformArgs};
use crate::error::TrellisTransformError;
use crate::facet::{facet_groups, group_indices};

#[derive(Debug, Clone)]
struct Axis {
    category: Channel,
    lo: Channel,
    hi: Channel,
}

const X_AXIS: Axis = Axis {
    category: Channel::X,
    lo: Channel::X1,
    hi: Channel::X2,
};

const Y_AXIS: Axis = Axis {
    category: Channel::Y,
    lo: Channel::Y1,
    hi: Channel::Y2,
};

#[derive(Debug, Clone)]
pub struct StackMosaic {
    outer: Axis,
    inner: Axis,
    value: Channel,
    percent_outer: bool,
    percent_inner: bool,
}

impl StackMosaic {
    /// Outer categories from `x` laid out along x, inner categories from `y`
    /// stacked along y
    pub fn x() -> Self {
        Self {
            outer: X_AXIS,
            inner: Y_AXIS,
            value: Channel::Weight,
            percent_outer: false,
            percent_inner: false,
        }
    }

    /// Outer categories from `y` laid out along y, inner categories from `x`
    /// stacked along x
    pub fn y() -> Self {
        Self {
            outer: Y_AXIS,
            inner: X_AXIS,
            value: Channel::Weight,
            percent_outer: false,
            percent_inner: false,
        }
    }

    /// Channel holding each record's magnitude; records count 1 when it is unset
    pub fn value(mut self, channel: Channel) -> Self {
        self.value = channel;
        self
    }

    /// Express the outer axis as a share of the grand total
    pub fn percent_outer(mut self, percent: bool) -> Self {
        self.percent_outer = percent;
        self
    }

    /// Express the inner axis as a share of each outer group's total
    pub fn percent_inner(mut self, percent: bool) -> Self {
        self.percent_inner = percent;
        self
    }
}

impl Transform for StackMosaic {
    fn transform(&self, args: TransformArgs) -> Result<TransformArgs, TrellisTransformError> {
        let n = args.data.len();
        let outer = args.require("stackMosaic", self.outer.category.clone())?;
        let inner = args.require("stackMosaic", self.inner.category.clone())?;
        let values = if args.has_channel(&self.value) {
            args.resolve_numbers(&self.value)?
        } else {
            vec![1.0; n]
        };
        if let Some(&value) = values.iter().find(|v| **v < 0.0) {
            return Err(TrellisTransformError::NegativeMosaicValue {
                channel: self.value.clone(),
                value,
            });
        }
        let magnitude = |i: usize| if values[i].is_finite() { values[i] } else { 0.0 };

        let mut outer_lo = vec![f64::NAN; n];
        let mut outer_hi = vec![f64::NAN; n];
        let mut inner_lo = vec![f64::NAN; n];
        let mut inner_hi = vec![f64::NAN; n];

        for indices in facet_groups(&args)?.into_values() {
            let groups = group_indices(&indices, &outer);
            let total: f64 = indices.iter().map(|&i| magnitude(i)).sum();

            // the first group fixes the inner order, later categories follow
            let mut inner_order: IndexSet<&RawValue> = IndexSet::new();
            for members in groups.values() {
                inner_order.extend(members.iter().map(|&i| &inner[i]));
            }
            let rank: IndexMap<&RawValue, usize> = inner_order
                .into_iter()
                .enumerate()
                .map(|(r, k)| (k, r))
                .collect();

            let mut x = 0.0;
            for members in groups.values() {
                let group_total: f64 = members.iter().map(|&i| magnitude(i)).sum();
                let (x1, x2) = (x, x + group_total);
                x = x2;
                let scale_outer = |v: f64| {
                    if self.percent_outer && total > 0.0 {
                        v / total
                    } else {
                        v
                    }
                };

                let mut members = members.clone();
                members.sort_by_key(|&i| rank.get(&inner[i]).copied());
                let mut y = 0.0;
                for i in members {
                    outer_lo[i] = scale_outer(x1);
                    outer_hi[i] = scale_outer(x2);
                    if !values[i].is_finite() {
                        continue;
                    }
                    let (y1, y2) = (y, y + values[i]);
                    y = y2;
                    let scale_inner = |v: f64| {
                        if self.percent_inner && group_total > 0.0 {
                            v / group_total
                        } else {
                            v
                        }
                    };
                    inner_lo[i] = scale_inner(y1);
                    inner_hi[i] = scale_inner(y2);
                }
            }
        }

        let keys: [InternalKey; 6] = [
            InternalKey::new("mosaic_outer_lo"),
            InternalKey::new("mosaic_outer_hi"),
            InternalKey::new("mosaic_outer_mid"),
            InternalKey::new("mosaic_inner_lo"),
            InternalKey::new("mosaic_inner_hi"),
            InternalKey::new("mosaic_inner_mid"),
        ];
        let data = args
            .data
            .iter()
            .enumerate()
            .map(|(i, record)| {
                record
                    .derive(i)
                    .with_field(keys[0], outer_lo[i])
                    .with_field(keys[1], outer_hi[i])
                    .with_field(keys[2], (outer_lo[i] + outer_hi[i]) / 2.0)
                    .with_field(keys[3], inner_lo[i])
                    .with_field(keys[4], inner_hi[i])
                    .with_field(keys[5], (inner_lo[i] + inner_hi[i]) / 2.0)
            })
            .collect();
        let channels = ChannelUpdate::from_channels(&args.channels)
            .column(self.outer.lo.clone(), keys[0])
            .column(self.outer.hi.clone(), keys[1])
            .column(self.outer.category.clone(), keys[2])
            .column(self.inner.lo.clone(), keys[3])
            .column(self.inner.hi.clone(), keys[4])
            .column(self.inner.category.clone(), keys[5])
            .finish();

        Ok(TransformArgs {
            data,
            channels,
            sorted: args.sorted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::{resolve_channel, DataRecord, Mark, MarkType};

    fn args(rows: &[(&str, &str, f64)]) -> TransformArgs {
        let data = rows
            .iter()
            .map(|(o, i, v)| {
                DataRecord::new()
                    .with_field("outer", *o)
                    .with_field("inner", *i)
                    .with_field("v", *v)
            })
            .collect();
        TransformArgs::from_mark(
            &Mark::new(MarkType::Rect, data)
                .channel(Channel::X, "outer")
                .channel(Channel::Y, "inner")
                .channel(Channel::Weight, "v"),
        )
    }

    fn column(out: &TransformArgs, channel: Channel) -> Vec<f64> {
        out.data
            .iter()
            .enumerate()
            .map(|(i, r)| {
                resolve_channel(&channel, r, i, &out.channels)
                    .unwrap()
                    .as_number()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_mosaic_layout() -> Result<(), TrellisTransformError> {
        let input = args(&[
            ("a", "p", 1.0),
            ("a", "q", 3.0),
            ("b", "q", 2.0),
            ("b", "p", 2.0),
        ]);
        let out = StackMosaic::x().transform(input)?;
        assert_eq!(column(&out, Channel::X1), vec![0.0, 0.0, 4.0, 4.0]);
        assert_eq!(column(&out, Channel::X2), vec![4.0, 4.0, 8.0, 8.0]);
        // inner order follows the first group: p below q
        assert_eq!(column(&out, Channel::Y1), vec![0.0, 1.0, 2.0, 0.0]);
        assert_eq!(column(&out, Channel::Y2), vec![1.0, 4.0, 4.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_mosaic_percent() -> Result<(), TrellisTransformError> {
        let input = args(&[("a", "p", 1.0), ("a", "q", 3.0), ("b", "p", 4.0)]);
        let out = StackMosaic::x()
            .percent_outer(true)
            .percent_inner(true)
            .transform(input)?;
        assert_eq!(column(&out, Channel::X2), vec![0.5, 0.5, 1.0]);
        assert_eq!(column(&out, Channel::Y2), vec![0.25, 1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_negative_values_are_rejected() {
        let input = args(&[("a", "p", 1.0), ("a", "q", -3.0)]);
        assert_eq!(
            StackMosaic::x().transform(input).err(),
            Some(TrellisTransformError::NegativeMosaicValue {
                channel: Channel::Weight,
                value: -3.0
            })
        );
    }
}
