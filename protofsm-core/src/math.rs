use std::collections::{BTreeMap, BTreeSet};

pub use indexmap::map;
pub use indexmap::set;

/// Type alias for maps that remember insertion order, we use this to hide which map we are
/// actually using.
pub type Map<K, V> = indexmap::IndexMap<K, V>;
/// Type alias for sets that remember insertion order.
pub type Set<S> = indexmap::IndexSet<S>;

/// Type alias for maps whose iteration order is given by the key ordering.
pub type OrderedMap<K, V> = BTreeMap<K, V>;
/// Type alias for sets whose iteration order is given by the element ordering.
pub type OrderedSet<S> = BTreeSet<S>;
