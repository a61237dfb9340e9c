//! Tick-to-tick convenience wrapper over the engine.

use std::fmt::Debug;
use std::hash::Hash;

use crate::deriver::DerivationSet;
use crate::runtime::DeriveRuntime;
use crate::snapshot::Snapshot;
use crate::DeriveError;

/// A session that carries snapshots across ticks for the caller.
///
/// The engine's [`resolve`](DeriveRuntime::resolve) contract expects the
/// caller to hold the previous input snapshot and the previous output
/// snapshot between ticks. `DeriveSession` bundles that bookkeeping with a
/// runtime and a derivation set: feed it a fresh input snapshot per tick and
/// it rotates the snapshots itself.
///
/// The first tick resolves against empty previous snapshots, so every
/// tracked deriver computes at least once.
///
/// # Example
///
/// ```
/// use derive_flow::{DerivationSet, Deriver, DeriveRuntime, DeriveSession, Snapshot};
///
/// # fn main() -> Result<(), derive_flow::DeriveError> {
/// let set = DerivationSet::new().with(
///     Deriver::new("foo", |ctx| Ok(ctx.input(&"bar").copied().unwrap_or(0) + 1))
///         .tracked(["bar"]),
/// );
///
/// let mut session = DeriveSession::new(DeriveRuntime::new(), set);
/// let outputs = session.tick(Snapshot::from_iter([("bar", 1)]))?;
/// assert_eq!(outputs.get(&"foo"), Some(&2));
/// # Ok(())
/// # }
/// ```
pub struct DeriveSession<K, V> {
    runtime: DeriveRuntime,
    set: DerivationSet<K, V>,
    previous_inputs: Snapshot<K, V>,
    previous_outputs: Snapshot<K, V>,
}

impl<K, V> DeriveSession<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone + PartialEq,
{
    /// Create a session over a runtime and a derivation set.
    pub fn new(runtime: DeriveRuntime, set: DerivationSet<K, V>) -> Self {
        Self {
            runtime,
            set,
            previous_inputs: Snapshot::new(),
            previous_outputs: Snapshot::new(),
        }
    }

    /// Run one tick against a fresh input snapshot.
    ///
    /// On success the session retains `next_inputs` and the produced output
    /// snapshot for the following tick. On failure the retained snapshots
    /// are left untouched; a failed tick produces nothing.
    pub fn tick(&mut self, next_inputs: Snapshot<K, V>) -> Result<Snapshot<K, V>, DeriveError> {
        let outputs = self.runtime.resolve(
            &self.set,
            &self.previous_inputs,
            &next_inputs,
            &self.previous_outputs,
        )?;
        self.previous_inputs = next_inputs;
        self.previous_outputs = outputs.clone();
        Ok(outputs)
    }

    /// The output snapshot of the last successful tick.
    pub fn outputs(&self) -> &Snapshot<K, V> {
        &self.previous_outputs
    }

    /// The runtime driving this session.
    pub fn runtime(&self) -> &DeriveRuntime {
        &self.runtime
    }

    /// The derivation set evaluated each tick.
    pub fn set(&self) -> &DerivationSet<K, V> {
        &self.set
    }

    /// Replace the derivation set for subsequent ticks.
    pub fn set_derivers(&mut self, set: DerivationSet<K, V>) {
        self.set = set;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deriver::Deriver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_session_rotates_snapshots() {
        let compute_count = Arc::new(AtomicUsize::new(0));
        let count = compute_count.clone();
        let set: DerivationSet<&'static str, i64> = DerivationSet::new().with(
            Deriver::new("foo", move |ctx| {
                count.fetch_add(1, Ordering::Relaxed);
                Ok(ctx.input(&"bar").copied().unwrap_or(0) + 1)
            })
            .tracked(["bar"]),
        );

        let mut session = DeriveSession::new(DeriveRuntime::new(), set);

        let outputs = session.tick(Snapshot::from_iter([("bar", 10)])).unwrap();
        assert_eq!(outputs.get(&"foo"), Some(&11));
        assert_eq!(compute_count.load(Ordering::Relaxed), 1);

        // Same tracked input: no recompute, same derived value.
        let outputs = session.tick(Snapshot::from_iter([("bar", 10)])).unwrap();
        assert_eq!(outputs.get(&"foo"), Some(&11));
        assert_eq!(compute_count.load(Ordering::Relaxed), 1);

        // Tracked input changed: recompute.
        let outputs = session.tick(Snapshot::from_iter([("bar", 20)])).unwrap();
        assert_eq!(outputs.get(&"foo"), Some(&21));
        assert_eq!(compute_count.load(Ordering::Relaxed), 2);
        assert_eq!(session.outputs().get(&"foo"), Some(&21));
    }

    #[test]
    fn test_failed_tick_leaves_session_untouched() {
        let set: DerivationSet<&'static str, i64> = DerivationSet::new().with(Deriver::new(
            "foo",
            |ctx| Ok(ctx.input(&"bar").copied().unwrap_or(0) + 1),
        ));
        let mut session = DeriveSession::new(DeriveRuntime::new(), set);
        session.tick(Snapshot::from_iter([("bar", 1)])).unwrap();
        let before = session.outputs().clone();

        // A set update that introduces a self-cycle fails the next tick.
        session.set_derivers(
            DerivationSet::new().with(Deriver::new("foo", |ctx| ctx.derived(&"foo"))),
        );
        let err = session.tick(Snapshot::from_iter([("bar", 2)])).unwrap_err();
        assert!(matches!(err, DeriveError::Cycle { .. }));
        assert_eq!(session.outputs(), &before);
    }
}
