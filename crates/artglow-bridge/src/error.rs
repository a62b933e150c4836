use artglow_fixture::FixtureError;

use crate::channel_map::FixtureId;

/// Errors that abort bridge startup.
///
/// Frame and dispatch errors never surface here; they are logged and
/// recovered where they happen.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A fixture could not be reached during initialization.
    #[error("fixture {fixture} is unreachable: {source}")]
    Connectivity {
        fixture: FixtureId,
        source: FixtureError,
    },

    /// Every configured fixture failed initialization.
    #[error("no fixtures available")]
    NoFixturesAvailable,

    /// Fewer channels per fixture than red, green, blue and brightness need.
    #[error("{0} channels per fixture is too few (need at least 4)")]
    ChannelsPerFixture(u16),

    /// A fixture's channels fall outside the DMX universe.
    #[error("fixture {fixture} uses channels {first}-{last}, outside 1-512")]
    ChannelOutOfRange {
        fixture: FixtureId,
        first: u32,
        last: u32,
    },

    /// Two fixtures share at least one channel.
    #[error("fixture {first} overlaps fixture {second} on channels {start}-{end}")]
    OverlappingChannels {
        first: FixtureId,
        second: FixtureId,
        start: u32,
        end: u32,
    },

    /// The same fixture id appears twice.
    #[error("fixture {0} is configured more than once")]
    DuplicateFixture(FixtureId),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
