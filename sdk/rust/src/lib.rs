//! Client for the liquidity provider server API.

pub mod client;

pub use client::{AcceptedQuote, ApiError, LpsClient, Quote, QuoteRequest, SdkError};
