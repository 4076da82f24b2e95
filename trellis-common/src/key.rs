use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Id 0 is reserved for [`InternalKey::VALUE`]
static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// A synthetic field key that can never collide with a user-supplied field name.
///
/// Transforms mint internal keys for the columns they synthesize (bin edges, stack
/// bounds, group outputs). Keys are compared by id only; the label is kept for
/// debugging output.
#[derive(Clone, Copy)]
pub struct InternalKey {
    id: u64,
    label: &'static str,
}

impl InternalKey {
    /// Key under which [`crate::recordize`] stores a promoted scalar
    pub const VALUE: InternalKey = InternalKey {
        id: 0,
        label: "value",
    };

    /// Mint a fresh, process-unique key
    pub fn new(label: &'static str) -> Self {
        Self {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            label,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl PartialEq for InternalKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InternalKey {}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for InternalKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InternalKey({}#{})", self.label, self.id)
    }
}

impl fmt::Display for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}#{}", self.label, self.id)
    }
}

/// Key of a field within a [`crate::DataRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    /// A user column name
    Name(String),
    /// A synthesized column
    Internal(InternalKey),
}

impl FieldKey {
    pub fn name(&self) -> Option<&str> {
        match self {
            FieldKey::Name(name) => Some(name.as_str()),
            FieldKey::Internal(_) => None,
        }
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        FieldKey::Name(value.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        FieldKey::Name(value)
    }
}

impl From<InternalKey> for FieldKey {
    fn from(value: InternalKey) -> Self {
        FieldKey::Internal(value)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => write!(f, "{name}"),
            FieldKey::Internal(key) => write!(f, "{key}"),
        }
    }
}
