//! HTTP API.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace span, timeout, body limit)
//!     → quote.rs (JSON in, QuoteProtocol call, JSON out)
//!     → response.rs (errors as status + { error, message })
//!     → Send to client
//! ```

pub mod quote;
pub mod response;
pub mod server;

pub use response::{ApiError, ErrorBody};
pub use server::{build_router, AppState, HttpServer, X_REQUEST_ID};
