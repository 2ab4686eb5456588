use thiserror::Error;

/// Startup configuration problems. These are always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TEAM_API_CODE is missing. Put it in .env or the environment")]
    MissingCredential,

    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),
}

/// Failures reported by the transport once its retry budget is spent.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered, but not with 200.
    #[error("{method} {path} -> {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("API code is not a valid header value")]
    InvalidCredential(#[from] reqwest::header::InvalidHeaderValue),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Problems turning a server brief into a `ParsedContext`.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed context JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported date format: {0}")]
    UnsupportedDate(String),
}

/// Why a pipeline run stopped early.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not fetch a brief: {0}")]
    Fetch(TransportError),

    #[error("could not parse the brief: {0}")]
    Parse(#[from] ParseError),

    #[error("submission failed: {0}")]
    Submit(TransportError),
}

impl PipelineError {
    /// Process exit code for this failure. `2` is reserved for configuration errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Fetch(_) => 3,
            PipelineError::Parse(_) => 4,
            PipelineError::Submit(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reads_like_a_request_line() {
        let err = TransportError::Status {
            method: "GET",
            path: "/request".to_string(),
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "GET /request -> 503: busy");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn exit_codes_are_distinct() {
        let status = |s| TransportError::Status {
            method: "POST",
            path: "/submit".to_string(),
            status: s,
            body: String::new(),
        };
        let codes = [
            PipelineError::Fetch(status(500)).exit_code(),
            PipelineError::Parse(ParseError::UnsupportedDate("x".into())).exit_code(),
            PipelineError::Submit(status(400)).exit_code(),
        ];
        assert_eq!(codes, [3, 4, 5]);
    }
}
