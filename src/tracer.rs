//! Tracer trait for observing tick resolution.
//!
//! This module defines the [`Tracer`] trait and related types for observing
//! how the engine resolves each tick: which derivers were recomputed and
//! why, which reused their previous value, and where a cycle was hit.
//! The default [`NoopTracer`] costs nothing when tracing is not needed.
//!
//! # Example
//!
//! ```
//! use derive_flow::{DeriveRuntime, RecomputeReason, SpanId, Tracer};
//!
//! struct PrintTracer;
//!
//! impl Tracer for PrintTracer {
//!     fn new_span_id(&self) -> SpanId {
//!         SpanId(1)
//!     }
//!
//!     fn on_recompute(&self, _span_id: SpanId, deriver: &str, reason: RecomputeReason) {
//!         println!("recomputing {deriver}: {reason:?}");
//!     }
//! }
//!
//! let runtime = DeriveRuntime::builder().tracer(PrintTracer).build();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for one tick resolution span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(pub u64);

/// Why a deriver's compute function was invoked for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeReason {
    /// The deriver declares no tracked inputs, so it always recomputes.
    Untracked,
    /// At least one tracked input differs between the previous and next
    /// input snapshots.
    TrackedChanged,
    /// Tracked inputs compare unchanged, but the previous output snapshot
    /// holds no value to reuse (typically the very first tick).
    NoPreviousValue,
}

/// Tracer trait for observing tick resolution.
///
/// All methods except [`new_span_id`](Tracer::new_span_id) have default
/// empty implementations, so implementations only override the events they
/// care about. Deriver names are passed as debug representations so the
/// trait stays object-safe and key-type agnostic.
///
/// Implementations must be `Send + Sync`; a runtime may be shared across
/// threads and each concurrent tick reports into the same tracer.
pub trait Tracer: Send + Sync + 'static {
    /// Generate a new unique span ID. Called once at the start of each tick.
    fn new_span_id(&self) -> SpanId;

    /// Called when a tick resolution starts, with the number of derivers in
    /// the set.
    #[inline]
    fn on_tick_start(&self, _span_id: SpanId, _deriver_count: usize) {}

    /// Called when a deriver's compute function is about to run.
    #[inline]
    fn on_recompute(&self, _span_id: SpanId, _deriver: &str, _reason: RecomputeReason) {}

    /// Called when a deriver reuses its previous-tick value without
    /// recomputing.
    #[inline]
    fn on_reuse(&self, _span_id: SpanId, _deriver: &str) {}

    /// Called when a resolution re-enters a deriver that is still being
    /// computed.
    #[inline]
    fn on_cycle(&self, _span_id: SpanId, _deriver: &str) {}

    /// Called when a tick resolution completes successfully.
    #[inline]
    fn on_tick_end(&self, _span_id: SpanId) {}
}

/// Zero-cost tracer that discards all events.
///
/// This is the default tracer for [`DeriveRuntime`](crate::DeriveRuntime).
pub struct NoopTracer;

/// Global span counter for NoopTracer.
static NOOP_SPAN_COUNTER: AtomicU64 = AtomicU64::new(1);

impl Tracer for NoopTracer {
    #[inline(always)]
    fn new_span_id(&self) -> SpanId {
        SpanId(NOOP_SPAN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
    // All other methods use the default empty implementations
}
