//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts and intervals
//! - Check seeded sources: unique non-reserved names, http(s) URLs, bounded intervals
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: AggregatorConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::AggregatorConfig;
use crate::merge::LOCAL_SOURCE;
use crate::registry::MAX_REFRESH_INTERVAL_SECS;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("sources[{0}]: name must not be empty")]
    EmptySourceName(usize),
    #[error("sources[{index}]: duplicate source name '{name}'")]
    DuplicateSourceName { index: usize, name: String },
    #[error("sources[{index}]: name '{name}' is reserved")]
    ReservedSourceName { index: usize, name: String },
    #[error("{field} must not exceed {MAX_REFRESH_INTERVAL_SECS} seconds, got {value}")]
    IntervalTooLarge { field: String, value: u64 },
    #[error("sources[{index}]: invalid url '{url}': {reason}")]
    InvalidSourceUrl { index: usize, url: String, reason: String },
}

pub fn validate_config(config: &AggregatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("listener.request_timeout_secs"));
    }
    if config.poller.fetch_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("poller.fetch_timeout_secs"));
    }
    if config.poller.min_interval_secs == 0 {
        errors.push(ValidationError::ZeroValue("poller.min_interval_secs"));
    }
    if config.poller.min_interval_secs > MAX_REFRESH_INTERVAL_SECS {
        errors.push(ValidationError::IntervalTooLarge {
            field: "poller.min_interval_secs".into(),
            value: config.poller.min_interval_secs,
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let mut names = HashSet::new();
    for (index, source) in config.sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            errors.push(ValidationError::EmptySourceName(index));
        } else if source.name.eq_ignore_ascii_case(LOCAL_SOURCE) {
            errors.push(ValidationError::ReservedSourceName {
                index,
                name: source.name.clone(),
            });
        } else if !names.insert(source.name.as_str()) {
            errors.push(ValidationError::DuplicateSourceName {
                index,
                name: source.name.clone(),
            });
        }

        if source.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS {
            errors.push(ValidationError::IntervalTooLarge {
                field: format!("sources[{index}].refresh_interval_secs"),
                value: source.refresh_interval_secs,
            });
        }

        if let Err(reason) = check_source_url(&source.url) {
            errors.push(ValidationError::InvalidSourceUrl {
                index,
                url: source.url.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A source URL must be absolute http or https.
pub fn check_source_url(raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}
