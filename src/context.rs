//! Per-tick resolution state and the deriver delegate.

use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::deriver::{DerivationSet, Deriver};
use crate::snapshot::Snapshot;
use crate::tracer::{RecomputeReason, SpanId, Tracer};
use crate::DeriveError;

/// Slot state for one deriver during one tick.
enum Slot<V> {
    /// Resolution marker: the deriver is being computed by an ancestor call
    /// in the current resolution chain. Never part of the public output.
    InProgress,
    /// Memoized value for this tick.
    Resolved(V),
}

/// The delegate passed to every deriver's compute function for one tick.
///
/// A context is created per [`resolve`](crate::DeriveRuntime::resolve) call
/// and owns all mutable resolution state, so concurrent ticks never share a
/// slot table. Deriver bodies use it to read the next input snapshot, the
/// previous output snapshot, and sibling derivers' current-tick values.
///
/// # Example
///
/// ```
/// use derive_flow::{DerivationSet, Deriver};
///
/// let set: DerivationSet<&str, i64> = DerivationSet::new()
///     .with(Deriver::new("foo", |ctx| {
///         Ok(ctx.input(&"bar").copied().unwrap_or(0) + 1)
///     }))
///     .with(Deriver::new("baz", |ctx| {
///         let foo = ctx.derived(&"foo")?;
///         Ok(foo + ctx.input(&"bar").copied().unwrap_or(0) + 10)
///     }));
/// # let _ = set;
/// ```
pub struct ResolveContext<'a, K, V> {
    set: &'a DerivationSet<K, V>,
    previous_inputs: &'a Snapshot<K, V>,
    next_inputs: &'a Snapshot<K, V>,
    previous_outputs: &'a Snapshot<K, V>,
    slots: RefCell<IndexMap<K, Slot<V>, ahash::RandomState>>,
    tracer: Arc<dyn Tracer>,
    debug: bool,
    span: SpanId,
}

impl<'a, K, V> ResolveContext<'a, K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone + PartialEq,
{
    pub(crate) fn new(
        set: &'a DerivationSet<K, V>,
        previous_inputs: &'a Snapshot<K, V>,
        next_inputs: &'a Snapshot<K, V>,
        previous_outputs: &'a Snapshot<K, V>,
        tracer: Arc<dyn Tracer>,
        debug: bool,
        span: SpanId,
    ) -> Self {
        let mut slots = IndexMap::default();
        slots.reserve(set.len());
        Self {
            set,
            previous_inputs,
            next_inputs,
            previous_outputs,
            slots: RefCell::new(slots),
            tracer,
            debug,
            span,
        }
    }

    /// Resolve a sibling deriver's value for the current tick.
    ///
    /// Triggers lazy resolution on first reference; later references within
    /// the same tick return the memoized value, so each compute function
    /// runs at most once per tick.
    ///
    /// # Errors
    ///
    /// - [`DeriveError::Cycle`] if `name` is currently being computed by an
    ///   ancestor call in the resolution chain (including self-reference).
    /// - [`DeriveError::UnknownDeriver`] if no deriver carries `name`.
    pub fn derived(&self, name: &K) -> Result<V, DeriveError> {
        {
            let slots = self.slots.borrow();
            match slots.get(name) {
                Some(Slot::InProgress) => {
                    let rendered = format!("{name:?}");
                    self.tracer.on_cycle(self.span, &rendered);
                    return Err(DeriveError::Cycle { name: rendered });
                }
                Some(Slot::Resolved(value)) => return Ok(value.clone()),
                None => {}
            }
        }

        let deriver = self.set.get(name).ok_or_else(|| DeriveError::UnknownDeriver {
            name: format!("{name:?}"),
        })?;

        self.slots
            .borrow_mut()
            .insert(name.clone(), Slot::InProgress);
        // The slot table borrow must be released before the compute function
        // runs; deriver bodies re-enter `derived` for their own dependencies.
        let value = self.resolve_value(deriver)?;
        self.slots
            .borrow_mut()
            .insert(name.clone(), Slot::Resolved(value.clone()));
        Ok(value)
    }

    /// Read a value from the next input snapshot.
    pub fn input(&self, name: &K) -> Option<&V> {
        self.next_inputs.get(name)
    }

    /// Read a value from the previous tick's output snapshot.
    pub fn previous(&self, name: &K) -> Option<&V> {
        self.previous_outputs.get(name)
    }

    /// The full next input snapshot.
    pub fn inputs(&self) -> &Snapshot<K, V> {
        self.next_inputs
    }

    /// The full previous-tick output snapshot.
    pub fn previous_outputs(&self) -> &Snapshot<K, V> {
        self.previous_outputs
    }

    /// Decide whether to reuse the previous output or invoke compute.
    fn resolve_value(&self, deriver: &Deriver<K, V>) -> Result<V, DeriveError> {
        let name = deriver.name();
        let reason = match deriver.tracked_inputs() {
            Some(tracked) => {
                let unchanged = tracked
                    .iter()
                    .all(|input| self.previous_inputs.get(input) == self.next_inputs.get(input));
                if unchanged {
                    if let Some(previous) = self.previous_outputs.get(name) {
                        if self.debug {
                            tracing::debug!(
                                deriver = ?name,
                                "tracked inputs unchanged, reusing previous derived value"
                            );
                        }
                        self.tracer.on_reuse(self.span, &format!("{name:?}"));
                        return Ok(previous.clone());
                    }
                    // Unchanged but nothing to reuse: first resolution of
                    // this deriver, so compute.
                    RecomputeReason::NoPreviousValue
                } else {
                    RecomputeReason::TrackedChanged
                }
            }
            None => RecomputeReason::Untracked,
        };

        if self.debug {
            tracing::debug!(deriver = ?name, ?reason, "recomputing derived value");
        }
        self.tracer
            .on_recompute(self.span, &format!("{name:?}"), reason);
        deriver.invoke(self)
    }

    /// Consume the context, yielding every resolved entry.
    pub(crate) fn into_resolved(self) -> impl Iterator<Item = (K, V)> {
        self.slots
            .into_inner()
            .into_iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Resolved(value) => Some((name, value)),
                Slot::InProgress => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::NoopTracer;

    fn context_fixture<'a>(
        set: &'a DerivationSet<&'static str, i64>,
        previous_inputs: &'a Snapshot<&'static str, i64>,
        next_inputs: &'a Snapshot<&'static str, i64>,
        previous_outputs: &'a Snapshot<&'static str, i64>,
    ) -> ResolveContext<'a, &'static str, i64> {
        ResolveContext::new(
            set,
            previous_inputs,
            next_inputs,
            previous_outputs,
            Arc::new(NoopTracer),
            false,
            SpanId(0),
        )
    }

    #[test]
    fn test_derived_memoizes_within_tick() {
        let set: DerivationSet<&'static str, i64> = DerivationSet::new().with(Deriver::new(
            "foo",
            |ctx| Ok(ctx.input(&"bar").copied().unwrap_or(0) + 1),
        ));
        let previous = Snapshot::new();
        let next = Snapshot::from_iter([("bar", 1)]);
        let outputs = Snapshot::new();
        let ctx = context_fixture(&set, &previous, &next, &outputs);

        assert_eq!(ctx.derived(&"foo").unwrap(), 2);
        assert_eq!(ctx.derived(&"foo").unwrap(), 2);
        let resolved: Vec<_> = ctx.into_resolved().collect();
        assert_eq!(resolved, [("foo", 2)]);
    }

    #[test]
    fn test_unknown_deriver() {
        let set: DerivationSet<&str, i64> = DerivationSet::new();
        let previous = Snapshot::new();
        let next = Snapshot::new();
        let outputs = Snapshot::new();
        let ctx = context_fixture(&set, &previous, &next, &outputs);

        let err = ctx.derived(&"ghost").unwrap_err();
        assert!(matches!(err, DeriveError::UnknownDeriver { .. }));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let set: DerivationSet<&'static str, i64> =
            DerivationSet::new().with(Deriver::new("foo", |ctx| ctx.derived(&"foo")));
        let previous = Snapshot::new();
        let next = Snapshot::new();
        let outputs = Snapshot::new();
        let ctx = context_fixture(&set, &previous, &next, &outputs);

        let err = ctx.derived(&"foo").unwrap_err();
        match err {
            DeriveError::Cycle { name } => assert_eq!(name, "\"foo\""),
            other => panic!("expected cycle, got {other}"),
        }
    }
}
