//! The derivation engine and its builder.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ResolveContext;
use crate::deriver::DerivationSet;
use crate::snapshot::Snapshot;
use crate::tracer::{NoopTracer, Tracer};
use crate::DeriveError;

/// The derivation engine.
///
/// A runtime owns no per-tick state: every [`resolve`](DeriveRuntime::resolve)
/// call builds its own slot table, so one runtime may serve concurrent ticks
/// from multiple threads. It carries only configuration (the debug flag) and
/// the tracer.
///
/// This is cheap to clone - shared state is behind `Arc`.
///
/// # Example
///
/// ```
/// use derive_flow::{DerivationSet, Deriver, DeriveRuntime, Snapshot};
///
/// # fn main() -> Result<(), derive_flow::DeriveError> {
/// let set = DerivationSet::new()
///     .with(Deriver::new("foo", |ctx| {
///         Ok(ctx.input(&"bar").copied().unwrap_or(0) + 1)
///     }));
///
/// let runtime = DeriveRuntime::new();
/// let next = Snapshot::from_iter([("bar", 1)]);
/// let outputs = runtime.resolve(&set, &Snapshot::new(), &next, &Snapshot::new())?;
///
/// assert_eq!(outputs.get(&"bar"), Some(&1));
/// assert_eq!(outputs.get(&"foo"), Some(&2));
/// # Ok(())
/// # }
/// ```
pub struct DeriveRuntime {
    debug: bool,
    tracer: Arc<RwLock<Arc<dyn Tracer>>>,
}

impl Default for DeriveRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DeriveRuntime {
    fn clone(&self) -> Self {
        Self {
            debug: self.debug,
            tracer: self.tracer.clone(),
        }
    }
}

impl DeriveRuntime {
    /// Create a new runtime with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for customizing the runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use derive_flow::DeriveRuntime;
    ///
    /// let runtime = DeriveRuntime::builder().debug(true).build();
    /// assert!(runtime.debug_enabled());
    /// ```
    pub fn builder() -> DeriveRuntimeBuilder {
        DeriveRuntimeBuilder::new()
    }

    /// Whether recompute/reuse decisions are logged via `tracing`.
    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Replace the tracer. Affects ticks started after the call.
    pub fn set_tracer(&self, tracer: Arc<dyn Tracer>) {
        *self.tracer.write() = tracer;
    }

    /// Resolve one tick.
    ///
    /// Produces the next output snapshot from the derivation set, the
    /// previous and next input snapshots, and the previous tick's output
    /// snapshot (empty on the first call). The result contains every key of
    /// `next_inputs` plus every key of `set`, with derived values shadowing
    /// same-named inputs.
    ///
    /// Every deriver is forced through resolution even when nothing
    /// references it, and each compute function runs at most once.
    /// Evaluation is demand-driven: a deriver referencing a sibling declared
    /// later in the set receives that sibling's resolved value.
    ///
    /// # Errors
    ///
    /// Fails without producing any output when a cycle is detected
    /// ([`DeriveError::Cycle`]), when a deriver references an unknown
    /// sibling ([`DeriveError::UnknownDeriver`]), or when a deriver body
    /// fails ([`DeriveError::User`]).
    pub fn resolve<K, V>(
        &self,
        set: &DerivationSet<K, V>,
        previous_inputs: &Snapshot<K, V>,
        next_inputs: &Snapshot<K, V>,
        previous_outputs: &Snapshot<K, V>,
    ) -> Result<Snapshot<K, V>, DeriveError>
    where
        K: Clone + Eq + Hash + Debug,
        V: Clone + PartialEq,
    {
        let tracer = self.tracer.read().clone();
        let span = tracer.new_span_id();
        tracer.on_tick_start(span, set.len());

        let ctx = ResolveContext::new(
            set,
            previous_inputs,
            next_inputs,
            previous_outputs,
            tracer.clone(),
            self.debug,
            span,
        );

        // Coverage pass: force every declared deriver through the marker and
        // memo protocol. Derivers already resolved as a dependency of an
        // earlier one hit their memoized slot here.
        for name in set.names() {
            ctx.derived(name)?;
        }

        let mut outputs = next_inputs.clone();
        outputs.extend(ctx.into_resolved());

        tracer.on_tick_end(span);
        Ok(outputs)
    }
}

/// Builder for [`DeriveRuntime`].
///
/// # Example
///
/// ```
/// use derive_flow::{DeriveRuntime, NoopTracer};
///
/// let runtime = DeriveRuntime::builder()
///     .debug(true)
///     .tracer(NoopTracer)
///     .build();
/// ```
pub struct DeriveRuntimeBuilder {
    debug: bool,
    tracer: Arc<dyn Tracer>,
}

impl Default for DeriveRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeriveRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            debug: false,
            tracer: Arc::new(NoopTracer),
        }
    }

    /// Log each recompute/reuse decision via `tracing::debug!`.
    ///
    /// Purely observational; resolution behavior is unaffected.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Install a tracer for structured observation of tick resolution.
    pub fn tracer(mut self, tracer: impl Tracer) -> Self {
        self.tracer = Arc::new(tracer);
        self
    }

    /// Build the runtime with the configured settings.
    pub fn build(self) -> DeriveRuntime {
        DeriveRuntime {
            debug: self.debug,
            tracer: Arc::new(RwLock::new(self.tracer)),
        }
    }
}
