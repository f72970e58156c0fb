use std::fmt;

/// Metadata about a successful call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestStatus {
    /// Status code of the final response.
    pub http_status: u16,
    /// Server-assigned `x-request-id`, when present.
    pub request_id: Option<String>,
    /// Number of retries consumed (attempts - 1).
    pub retries: usize,
    /// Wall-clock time from the first attempt to the return, in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP {}, retries={}, duration={}ms, requestId={}",
            self.http_status,
            self.retries,
            self.duration_ms,
            self.request_id.as_deref().unwrap_or("nil")
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::RequestStatus;

    #[test]
    fn display_renders_all_fields() {
        let mut status = RequestStatus {
            http_status: 200,
            request_id: Some("req_123".to_owned()),
            retries: 1,
            duration_ms: 42,
        };
        assert_eq!(
            status.to_string(),
            "HTTP 200, retries=1, duration=42ms, requestId=req_123"
        );

        status.request_id = None;
        assert!(status.to_string().ends_with("requestId=nil"));
    }
}
