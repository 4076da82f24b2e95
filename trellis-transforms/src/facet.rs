//! Partitioning of record indices by facet, series, and arbitrary channels.
//!
//! Groups keep first-seen order so that transform output is deterministic.

use indexmap::IndexMap;
use trellis_common::{resolve_channel, Channel, Channels, RawValue};

use crate::core::TransformArgs;
use crate::error::TrellisTransformError;

/// Facet cell identity: the resolved `fx` and `fy` values
pub type FacetKey = (RawValue, RawValue);

/// Partition every record index by facet cell
pub fn facet_groups(
    args: &TransformArgs,
) -> Result<IndexMap<FacetKey, Vec<usize>>, TrellisTransformError> {
    let fx = args.resolve(&Channel::Fx)?;
    let fy = args.resolve(&Channel::Fy)?;
    let mut groups: IndexMap<FacetKey, Vec<usize>> = IndexMap::new();
    for (i, (x, y)) in fx.into_iter().zip(fy).enumerate() {
        groups.entry((x, y)).or_default().push(i);
    }
    Ok(groups)
}

/// Series value of every record: `z`, falling back to `fill` then `stroke`.
///
/// Channels listed in `exclude` (typically the outputs a transform is about to
/// compute) never act as the series channel.
pub fn series_values(
    args: &TransformArgs,
    exclude: &[Channel],
) -> Result<Option<Vec<RawValue>>, TrellisTransformError> {
    let channels: Channels = args
        .channels
        .iter()
        .filter(|(channel, _)| !exclude.contains(channel))
        .map(|(channel, accessor)| (channel.clone(), accessor.clone()))
        .collect();
    let has_series = [Channel::Z, Channel::Fill, Channel::Stroke]
        .iter()
        .any(|c| channels.contains_key(c));
    if !has_series {
        return Ok(None);
    }
    args.data
        .iter()
        .enumerate()
        .map(|(i, record)| Ok(resolve_channel(&Channel::Z, record, i, &channels)?))
        .collect::<Result<Vec<_>, TrellisTransformError>>()
        .map(Some)
}

/// Split `indices` by the value each record has in `keys`
pub fn group_indices(
    indices: &[usize],
    keys: &[RawValue],
) -> IndexMap<RawValue, Vec<usize>> {
    let mut groups: IndexMap<RawValue, Vec<usize>> = IndexMap::new();
    for &i in indices {
        groups.entry(keys[i].clone()).or_default().push(i);
    }
    groups
}

/// Partition every record index by facet cell, then by series.
///
/// Without a series channel each facet forms a single group.
pub fn facet_series_groups(
    args: &TransformArgs,
    exclude: &[Channel],
) -> Result<Vec<Vec<usize>>, TrellisTransformError> {
    let facets = facet_groups(args)?;
    let series = series_values(args, exclude)?;
    let mut groups = Vec::new();
    for indices in facets.into_values() {
        match &series {
            Some(keys) => groups.extend(group_indices(&indices, keys).into_values()),
            None => groups.push(indices),
        }
    }
    Ok(groups)
}
