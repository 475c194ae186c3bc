//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check that every address and key parses in its chain's format
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LpsConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::codec::{decode_btc_address, decode_evm_address};
use crate::config::schema::LpsConfig;
use crate::federation::FederatorKey;

/// One semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &LpsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::new("server.max_body_size", "must be > 0"));
    }

    let rsk = &config.rsk;
    if let Err(e) = rsk.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("rsk.rpc_url", e.to_string()));
    }
    if let Err(e) = decode_evm_address(&rsk.lbc_address) {
        errors.push(ValidationError::new("rsk.lbc_address", e.to_string()));
    }
    if let Err(e) = decode_evm_address(&rsk.bridge_address) {
        errors.push(ValidationError::new("rsk.bridge_address", e.to_string()));
    }
    if rsk.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("rsk.rpc_timeout_secs", "must be > 0"));
    }
    if rsk.retry.max_attempts == 0 {
        errors.push(ValidationError::new("rsk.retry.max_attempts", "must be >= 1"));
    }

    for (i, key) in config.federation.erp_keys.iter().enumerate() {
        let parsed = FederatorKey::btc_from_hex(key)
            .map_err(|e| e.to_string())
            .and_then(|k| k.to_public_key().map_err(|e| e.to_string()));
        if let Err(e) = parsed {
            errors.push(ValidationError::new(format!("federation.erp_keys[{}]", i), e));
        }
    }

    if config.providers.is_empty() {
        errors.push(ValidationError::new("providers", "at least one provider is required"));
    }
    let mut names = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        let prefix = format!("providers[{}]", i);
        if provider.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", prefix), "must not be empty"));
        } else if !names.insert(provider.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", prefix),
                format!("duplicate provider name '{}'", provider.name),
            ));
        }
        if let Err(e) = decode_btc_address(&provider.btc_address) {
            errors.push(ValidationError::new(format!("{}.btc_address", prefix), e.to_string()));
        }
        if provider.private_key_env.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.private_key_env", prefix),
                "must name an environment variable",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
