//! Liquidity provider server for a Bitcoin to EVM bridge.

pub mod blockchain;
pub mod codec;
pub mod config;
pub mod federation;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod quoting;
pub mod resilience;
pub mod storage;

pub use config::LpsConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use quoting::QuoteProtocol;
