use trellis_common::RawValue;

use super::ScalePrimitive;
use crate::options::ScaleType;

/// Maps every input to one value. Backs dummy scales.
#[derive(Debug, Clone)]
pub struct ConstantScale {
    scale_type: ScaleType,
    value: RawValue,
}

impl ConstantScale {
    pub fn new(scale_type: ScaleType, value: RawValue) -> Self {
        Self { scale_type, value }
    }
}

impl ScalePrimitive for ConstantScale {
    fn scale_type(&self) -> ScaleType {
        self.scale_type
    }

    fn apply(&self, _value: &RawValue) -> RawValue {
        self.value.clone()
    }

    fn domain(&self) -> Vec<RawValue> {
        vec![]
    }

    fn range(&self) -> Vec<RawValue> {
        vec![self.value.clone()]
    }
}
