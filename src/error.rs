use thiserror::Error;

/// Failure classes shared by every backend flow and the chat session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connectivity, timeout or an unreadable response body.
    #[error("network error: {0}")]
    Transient(String),
    /// Business failure reported by the backend; shown verbatim.
    #[error("{0}")]
    Domain(String),
    /// Backend needs elevated rights (`needAdmin`).
    #[error("{0}")]
    Permission(String),
    /// Local input rejected before any request was made.
    #[error("{0}")]
    Validation(String),
    /// Realtime frame that could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Message suitable for a notice. Transient failures collapse to one generic line.
    pub fn notice_text(&self) -> String {
        match self {
            ClientError::Transient(_) => {
                "Request failed: check the network connection or backend service".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => ClientError::Transient(format!("server returned {code}")),
            ureq::Error::Transport(transport) => ClientError::Transient(transport.to_string()),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transient(format!("invalid response: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_notice_is_generic() {
        let err = ClientError::Transient("connection refused".to_string());
        assert!(!err.notice_text().contains("refused"));
        let err = ClientError::Domain("slug not found".to_string());
        assert_eq!(err.notice_text(), "slug not found");
    }
}
