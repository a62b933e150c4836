use std::fmt;
use std::io;

use artglow_bridge::BridgeError;
use artglow_frame::FrameError;
use artglow_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const NO_FIXTURES: i32 = 4;
pub const CONFIG_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(CONFIG_INVALID, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::TooManyChannels { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::Malformed { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Connectivity { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        BridgeError::NoFixturesAvailable => CliError::new(NO_FIXTURES, format!("{context}: {err}")),
        BridgeError::ChannelsPerFixture(_)
        | BridgeError::ChannelOutOfRange { .. }
        | BridgeError::OverlappingChannels { .. }
        | BridgeError::DuplicateFixture(_) => {
            CliError::new(CONFIG_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use artglow_bridge::FixtureId;

    use super::*;

    #[test]
    fn layout_errors_are_config_errors() {
        let err = bridge_error(
            "invalid layout",
            BridgeError::DuplicateFixture(FixtureId::from("10.0.0.1")),
        );
        assert_eq!(err.code, CONFIG_INVALID);
        assert!(err.message.starts_with("invalid layout: "));
    }

    #[test]
    fn startup_errors_have_distinct_codes() {
        assert_eq!(
            bridge_error("start", BridgeError::NoFixturesAvailable).code,
            NO_FIXTURES
        );

        let busy = TransportError::Bind {
            addr: "0.0.0.0:6454".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert_eq!(transport_error("bind", busy).code, TRANSPORT_ERROR);
    }
}
