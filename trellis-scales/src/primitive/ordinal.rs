use std::collections::HashMap;

use trellis_common::RawValue;

use super::ScalePrimitive;
use crate::options::ScaleType;

/// Maps each domain value to the range value at the same index, cycling the
/// range when it is shorter than the domain.
#[derive(Debug, Clone)]
pub struct OrdinalScale {
    scale_type: ScaleType,
    domain: Vec<RawValue>,
    range: Vec<RawValue>,
    index: HashMap<RawValue, usize>,
    unknown: RawValue,
}

impl OrdinalScale {
    pub fn new(scale_type: ScaleType, domain: Vec<RawValue>, range: Vec<RawValue>) -> Self {
        let mut index = HashMap::with_capacity(domain.len());
        for (i, value) in domain.iter().enumerate() {
            index.entry(value.clone()).or_insert(i);
        }
        Self {
            scale_type,
            domain,
            range,
            index,
            unknown: RawValue::Null,
        }
    }

    /// Output for values outside the domain
    pub fn with_unknown(mut self, unknown: RawValue) -> Self {
        self.unknown = unknown;
        self
    }
}

impl ScalePrimitive for OrdinalScale {
    fn scale_type(&self) -> ScaleType {
        self.scale_type
    }

    fn apply(&self, value: &RawValue) -> RawValue {
        if self.range.is_empty() {
            return self.unknown.clone();
        }
        match self.index.get(value) {
            Some(i) => self.range[i % self.range.len()].clone(),
            None => self.unknown.clone(),
        }
    }

    fn domain(&self) -> Vec<RawValue> {
        self.domain.clone()
    }

    fn range(&self) -> Vec<RawValue> {
        self.range.clone()
    }

    fn ticks(&self, _count: f64) -> Vec<RawValue> {
        self.domain.clone()
    }
}
