use std::time::Duration;

/// Errors reported by fixture operations.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// The fixture answered but rejected the command or reported a fault.
    #[error("fixture {fixture} reported an error: {message}")]
    Reported { fixture: String, message: String },

    /// The fixture could not be reached or the connection broke.
    #[error("cannot reach fixture {fixture}: {source}")]
    Connectivity {
        fixture: String,
        source: std::io::Error,
    },

    /// The fixture did not answer in time.
    #[error("fixture {fixture} did not respond within {timeout:?}")]
    Timeout { fixture: String, timeout: Duration },

    /// A command was issued before `connect`.
    #[error("fixture {0} is not connected")]
    NotConnected(String),
}

impl FixtureError {
    /// Whether the fixture itself is reachable and only this command failed.
    ///
    /// Startup skips fixtures failing with a recoverable error and aborts on
    /// any other kind.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FixtureError::Reported { .. })
    }
}

pub type Result<T> = std::result::Result<T, FixtureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reported_errors_are_recoverable() {
        let reported = FixtureError::Reported {
            fixture: "lamp".to_string(),
            message: "unsupported method".to_string(),
        };
        let unreachable = FixtureError::Connectivity {
            fixture: "lamp".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        let timeout = FixtureError::Timeout {
            fixture: "lamp".to_string(),
            timeout: Duration::from_secs(1),
        };

        assert!(reported.is_recoverable());
        assert!(!unreachable.is_recoverable());
        assert!(!timeout.is_recoverable());
        assert!(!FixtureError::NotConnected("lamp".to_string()).is_recoverable());
    }
}
