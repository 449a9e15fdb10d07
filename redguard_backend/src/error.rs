use thiserror::Error;

/// Failures talking to the Moltbook REST API.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Rate limited. Retry after {retry_after_minutes} minutes")]
    RateLimited { retry_after_minutes: u64 },

    #[error("Moltbook API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PlatformError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PlatformError::RateLimited { .. })
    }
}

/// Failures from the local completion endpoint.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Model server not reachable at {url} (is `ollama serve` running?)")]
    Unavailable { url: String },

    #[error("Model request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid model response: {details}")]
    InvalidResponse { details: String },

    #[error("Model request failed: {details}")]
    Request { details: String },

    #[error("Model returned an empty completion")]
    Empty,
}

/// The optional NLP collaborator could not analyze the text.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("NLP pipeline unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_distinguishable() {
        let limited = PlatformError::RateLimited {
            retry_after_minutes: 12,
        };
        assert!(limited.is_rate_limited());
        assert!(limited.to_string().contains("12 minutes"));

        let other = PlatformError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(!other.is_rate_limited());
    }
}
