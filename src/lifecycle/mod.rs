//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting → in-flight requests drain
//!     → quote store snapshot written → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config, logging, connector, providers, store, listener
//! - Ordered shutdown: stop accept, drain, persist

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
