/// Errors from the external AI service layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("AI service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose payload could not be used.
    #[error("Malformed response from AI service: {0}")]
    Malformed(String),

    #[error("AI provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Request(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Malformed(_) | ProviderError::NotConfigured(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let err = |status| ProviderError::Api {
            status,
            body: String::new(),
        };
        assert!(err(429).is_retryable());
        assert!(err(502).is_retryable());
        assert!(!err(400).is_retryable());
        assert!(!err(404).is_retryable());
        assert!(!ProviderError::Malformed("x".into()).is_retryable());
    }
}
