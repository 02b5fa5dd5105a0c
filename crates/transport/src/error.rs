//! Transport-layer error taxonomy.

/// Classifies what went wrong so the server manager can decide whether to
/// reconnect (spawn/network/protocol) or just fail the one in-flight call
/// (framing/too-large).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Spawn,
    Network,
    Protocol,
    Framing,
    TooLarge,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportErrorKind::Spawn => "spawn",
            TransportErrorKind::Network => "network",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Framing => "framing",
            TransportErrorKind::TooLarge => "tooLarge",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("transport error ({kind}): {cause}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub cause: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, cause: impl Into<String>) -> Self {
        Self { kind, cause: cause.into() }
    }

    pub fn spawn(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Spawn, cause)
    }

    pub fn network(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, cause)
    }

    pub fn protocol(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, cause)
    }

    pub fn framing(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Framing, cause)
    }

    pub fn too_large(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::TooLarge, cause)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::spawn(e.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::framing(e.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_cause() {
        let e = TransportError::too_large("4194305 bytes");
        assert_eq!(e.to_string(), "transport error (tooLarge): 4194305 bytes");
    }
}
