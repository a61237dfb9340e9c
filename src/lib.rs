#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod context;
mod deriver;
mod error;
mod runtime;
mod session;
mod snapshot;
pub mod tracer;

pub use context::ResolveContext;
pub use deriver::{ComputeFn, DerivationSet, Deriver};
pub use error::DeriveError;
pub use runtime::{DeriveRuntime, DeriveRuntimeBuilder};
pub use session::DeriveSession;
pub use snapshot::Snapshot;
pub use tracer::{NoopTracer, RecomputeReason, SpanId, Tracer};
