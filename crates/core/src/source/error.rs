use std::fmt;

/// Failure talking to the recommendation source, with enough of the response
/// kept around to report it.
#[derive(Debug, Clone)]
pub struct SourceDiagnosticsError {
    pub source_name: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub http_status: Option<u16>,
    pub raw_body: Option<String>,
}

impl SourceDiagnosticsError {
    /// 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.http_status, Some(429) | Some(500..=599))
    }
}

impl fmt::Display for SourceDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recommendation source error (source={}, stage={}): {}",
            self.source_name, self.stage, self.detail
        )
    }
}

impl std::error::Error for SourceDiagnosticsError {}
