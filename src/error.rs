//! Error taxonomy shared by the sampler, the polling controller and the route analyzer.

use thiserror::Error;

/// Errors produced while sampling or aggregating traffic data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrafficError {
    /// Malformed coordinate, checkpoint count or configuration. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport failure, timeout or non-success provider status.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider answered but the payload could not be normalized.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Every checkpoint of a route failed or returned an unusable sample.
    #[error("no traffic data available for this route")]
    NoRouteData,
}

impl TrafficError {
    /// Whether the next poll tick may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrafficError::ProviderUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, TrafficError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_provider_errors_are_retryable() {
        assert!(TrafficError::ProviderUnavailable("HTTP 503".into()).is_retryable());
        assert!(!TrafficError::InvalidArgument("lat".into()).is_retryable());
        assert!(!TrafficError::MalformedResponse("speed".into()).is_retryable());
        assert!(!TrafficError::NoRouteData.is_retryable());
    }

    #[test]
    fn test_display_carries_provider_message() {
        let err = TrafficError::ProviderUnavailable("quota exceeded".into());
        assert_eq!(err.to_string(), "provider unavailable: quota exceeded");
    }
}
