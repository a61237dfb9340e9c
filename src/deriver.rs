//! Deriver definitions and the derivation set.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::ResolveContext;
use crate::DeriveError;

/// Shared compute function for a deriver.
///
/// The function receives the per-tick [`ResolveContext`], through which it
/// reads the next input snapshot, the previous output snapshot, and the
/// current-tick values of sibling derivers.
pub type ComputeFn<K, V> =
    Arc<dyn Fn(&ResolveContext<'_, K, V>) -> Result<V, DeriveError> + Send + Sync>;

/// A named, pure computation producing one derived value per tick.
///
/// A deriver optionally declares *tracked inputs*: the subset of base input
/// names whose change forces recomputation. When every tracked input holds
/// an equal value in the previous and next input snapshots, the engine
/// reuses the previous tick's output verbatim without invoking the compute
/// function. A deriver with no tracked inputs recomputes every tick.
///
/// # Example
///
/// ```
/// use derive_flow::Deriver;
///
/// let subtotal = Deriver::new("subtotal", |ctx| {
///     Ok(ctx.input(&"items").copied().unwrap_or(0))
/// })
/// .tracked(["items"]);
///
/// assert_eq!(subtotal.name(), &"subtotal");
/// ```
pub struct Deriver<K, V> {
    name: K,
    compute: ComputeFn<K, V>,
    tracked: Option<Vec<K>>,
}

impl<K, V> Deriver<K, V> {
    /// Create a deriver with the given name and compute function.
    ///
    /// The deriver recomputes on every tick until
    /// [`tracked`](Deriver::tracked) declares its input dependencies.
    pub fn new<F>(name: K, compute: F) -> Self
    where
        F: Fn(&ResolveContext<'_, K, V>) -> Result<V, DeriveError> + Send + Sync + 'static,
    {
        Self {
            name,
            compute: Arc::new(compute),
            tracked: None,
        }
    }

    /// Declare the input names whose change forces recomputation.
    ///
    /// The order is preserved but has no semantic effect; comparison is
    /// per-name. An empty list means "never recompute once resolved".
    pub fn tracked<I: IntoIterator<Item = K>>(mut self, inputs: I) -> Self {
        self.tracked = Some(inputs.into_iter().collect());
        self
    }

    /// The deriver's name, unique within a derivation set.
    pub fn name(&self) -> &K {
        &self.name
    }

    /// The declared tracked inputs, if any.
    pub fn tracked_inputs(&self) -> Option<&[K]> {
        self.tracked.as_deref()
    }

    pub(crate) fn invoke(&self, ctx: &ResolveContext<'_, K, V>) -> Result<V, DeriveError> {
        (self.compute)(ctx)
    }
}

impl<K: Clone, V> Clone for Deriver<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            compute: self.compute.clone(),
            tracked: self.tracked.clone(),
        }
    }
}

impl<K: Debug, V> Debug for Deriver<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deriver")
            .field("name", &self.name)
            .field("tracked", &self.tracked)
            .finish_non_exhaustive()
    }
}

/// The full named collection of derivers evaluated together per tick.
///
/// Insertion order is preserved and determines the order of the engine's
/// final coverage pass; resolution itself is demand-driven, so a deriver
/// may reference siblings declared after it.
pub struct DerivationSet<K, V> {
    derivers: IndexMap<K, Deriver<K, V>, ahash::RandomState>,
}

impl<K, V> DerivationSet<K, V> {
    /// Create an empty derivation set.
    pub fn new() -> Self {
        Self {
            derivers: IndexMap::default(),
        }
    }

    /// Number of derivers in the set.
    pub fn len(&self) -> usize {
        self.derivers.len()
    }

    /// Returns `true` if the set holds no derivers.
    pub fn is_empty(&self) -> bool {
        self.derivers.is_empty()
    }

    /// Iterate over deriver names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &K> {
        self.derivers.keys()
    }

    /// Iterate over derivers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Deriver<K, V>> {
        self.derivers.values()
    }
}

impl<K, V> DerivationSet<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Add a deriver, returning the one it replaced if the name was already
    /// present. Each name appears at most once in the set.
    pub fn add(&mut self, deriver: Deriver<K, V>) -> Option<Deriver<K, V>> {
        self.derivers.insert(deriver.name.clone(), deriver)
    }

    /// Builder-style [`add`](DerivationSet::add).
    pub fn with(mut self, deriver: Deriver<K, V>) -> Self {
        self.add(deriver);
        self
    }

    /// Get the deriver registered under `name`, if any.
    pub fn get(&self, name: &K) -> Option<&Deriver<K, V>> {
        self.derivers.get(name)
    }
}

impl<K, V> Default for DerivationSet<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V> Clone for DerivationSet<K, V> {
    fn clone(&self) -> Self {
        Self {
            derivers: self.derivers.clone(),
        }
    }
}

impl<K: Debug, V> Debug for DerivationSet<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.derivers.iter()).finish()
    }
}

impl<K: Clone + Eq + Hash, V> FromIterator<Deriver<K, V>> for DerivationSet<K, V> {
    fn from_iter<I: IntoIterator<Item = Deriver<K, V>>>(iter: I) -> Self {
        let mut set = Self::new();
        for deriver in iter {
            set.add(deriver);
        }
        set
    }
}
