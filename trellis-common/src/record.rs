use indexmap::IndexMap;

use crate::key::{FieldKey, InternalKey};
use crate::value::RawValue;

/// An ordered mapping from field keys to values.
///
/// Records produced by transforms remember the index of the input record they were
/// derived from, so later stages can recover the source datum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRecord {
    fields: IndexMap<FieldKey, RawValue>,
    unwrapped: Option<RawValue>,
    source_index: Option<usize>,
}

/// The view of a record handed to accessor functions
#[derive(Debug, Clone, Copy)]
pub enum Datum<'a> {
    Record(&'a DataRecord),
    /// The original scalar of a recordized datum
    Value(&'a RawValue),
}

impl<'a> Datum<'a> {
    pub fn get(&self, key: impl Into<FieldKey>) -> RawValue {
        match self {
            Datum::Record(record) => record.get(&key.into()).cloned().unwrap_or_default(),
            Datum::Value(_) => RawValue::Null,
        }
    }

    pub fn value(&self) -> Option<&'a RawValue> {
        match self {
            Datum::Value(value) => Some(value),
            Datum::Record(_) => None,
        }
    }
}

impl DataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FieldKey) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn get_name(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(&FieldKey::Name(name.to_string()))
    }

    pub fn contains_key(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<FieldKey>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn with_field(mut self, key: impl Into<FieldKey>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn fields(&self) -> &IndexMap<FieldKey, RawValue> {
        &self.fields
    }

    /// The scalar this record was promoted from by [`recordize`], if any
    pub fn unwrapped(&self) -> Option<&RawValue> {
        self.unwrapped.as_ref()
    }

    pub fn source_index(&self) -> Option<usize> {
        self.source_index
    }

    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = Some(index);
        self
    }

    /// View handed to accessor functions. Recordized data exposes the original
    /// scalar so user accessors never see the wrapper.
    pub fn as_datum(&self) -> Datum<'_> {
        match &self.unwrapped {
            Some(value) => Datum::Value(value),
            None => Datum::Record(self),
        }
    }

    /// Copy of this record, tagged as derived from input record `index`.
    /// An existing back-reference is kept so chained transforms point at the
    /// original input.
    pub fn derive(&self, index: usize) -> Self {
        let mut record = self.clone();
        record.source_index = Some(self.source_index.unwrap_or(index));
        record
    }
}

impl<K: Into<FieldKey>, V: Into<RawValue>> FromIterator<(K, V)> for DataRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            unwrapped: None,
            source_index: None,
        }
    }
}

/// Promote raw scalars to records so downstream code can treat all data uniformly.
///
/// The scalar is stored under [`InternalKey::VALUE`] and also remembered as the
/// unwrapped datum for accessor functions.
pub fn recordize(values: impl IntoIterator<Item = RawValue>) -> Vec<DataRecord> {
    values
        .into_iter()
        .map(|value| {
            let mut record = DataRecord::new();
            record.insert(InternalKey::VALUE, value.clone());
            record.unwrapped = Some(value);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recordize_exposes_original_value() {
        let records = recordize(vec![RawValue::from(3.0), RawValue::from("a")]);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get(&FieldKey::Internal(InternalKey::VALUE)),
            Some(&RawValue::from(3.0))
        );
        match records[1].as_datum() {
            Datum::Value(v) => assert_eq!(v, &RawValue::from("a")),
            Datum::Record(_) => panic!("expected unwrapped value"),
        }
    }

    #[test]
    fn test_derive_keeps_first_back_reference() {
        let record: DataRecord = [("a", 1.0)].into_iter().collect();
        let derived = record.derive(4).derive(0);
        assert_eq!(derived.source_index(), Some(4));
    }
}
