//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Chain read:
//!     → timeouts.rs (per-call RPC deadline)
//!     → retries.rs (fixed backoff, acceptance predicate, overall deadline)
//!     → success, or ChainReadFailure carrying attempts and last error
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Only reads are retried; contract writes are submitted once
//! - An empty or zero result counts as inconclusive and is retried

pub mod retries;
pub mod timeouts;

pub use retries::{RetryExhausted, RetryPolicy};
pub use timeouts::rpc_call;
