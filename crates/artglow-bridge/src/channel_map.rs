use std::fmt;

use artglow_frame::{Frame, MAX_CHANNELS};
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::state::FixtureState;

/// Red, green, blue and brightness.
pub const DEFAULT_CHANNELS_PER_FIXTURE: u16 = 4;

/// Stable identity of a configured fixture (its configured address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(String);

impl FixtureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FixtureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 1-based DMX channels driving one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub id: FixtureId,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub brightness: u16,
}

impl ChannelMapping {
    /// First channel of the fixture's block.
    pub fn first(&self) -> u32 {
        u32::from(self.red)
    }

    /// Last channel of the fixture's block.
    pub fn last(&self) -> u32 {
        u32::from(self.brightness)
    }

    /// Cut this fixture's state out of a frame.
    ///
    /// Channels the frame does not carry read as 0 for color and as full
    /// brightness.
    pub fn extract(&self, frame: &Frame) -> FixtureState {
        FixtureState {
            red: frame.channel(self.red).unwrap_or(0),
            green: frame.channel(self.green).unwrap_or(0),
            blue: frame.channel(self.blue).unwrap_or(0),
            brightness: frame.channel(self.brightness).unwrap_or(u8::MAX),
        }
    }
}

/// Per-fixture channel assignments, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    mappings: Vec<ChannelMapping>,
    channels_per_fixture: u16,
}

impl ChannelMap {
    /// Lay out fixtures from their start channels and log the channel range
    /// in use.
    ///
    /// Color occupies the first three channels of each block and brightness
    /// the last, so a 5-channel layout leaves one unused channel before
    /// brightness.
    pub fn build<I>(fixtures: I, channels_per_fixture: u16) -> Self
    where
        I: IntoIterator<Item = (FixtureId, u16)>,
    {
        let map = Self::layout(fixtures, channels_per_fixture);
        if let Some((first, last)) = map.channel_range() {
            info!(first, last, fixtures = map.len(), "dmx channels in use");
        }
        map
    }

    /// Same as [`build`](Self::build) without logging, for checking a planned
    /// layout.
    pub fn layout<I>(fixtures: I, channels_per_fixture: u16) -> Self
    where
        I: IntoIterator<Item = (FixtureId, u16)>,
    {
        let mappings = fixtures
            .into_iter()
            .map(|(id, start)| ChannelMapping {
                id,
                red: start,
                green: start.saturating_add(1),
                blue: start.saturating_add(2),
                brightness: start.saturating_add(channels_per_fixture.saturating_sub(1)),
            })
            .collect();

        Self {
            mappings,
            channels_per_fixture,
        }
    }

    /// Check the layout: enough channels per fixture, every block inside the
    /// universe, no two blocks sharing a channel.
    pub fn validate(&self) -> Result<()> {
        if self.channels_per_fixture < DEFAULT_CHANNELS_PER_FIXTURE {
            return Err(BridgeError::ChannelsPerFixture(self.channels_per_fixture));
        }

        for mapping in &self.mappings {
            let last = mapping.first() + u32::from(self.channels_per_fixture) - 1;
            if mapping.first() == 0 || last > MAX_CHANNELS as u32 {
                return Err(BridgeError::ChannelOutOfRange {
                    fixture: mapping.id.clone(),
                    first: mapping.first(),
                    last,
                });
            }
        }

        for (i, a) in self.mappings.iter().enumerate() {
            if let Some(dup) = self.mappings[i + 1..].iter().find(|b| b.id == a.id) {
                return Err(BridgeError::DuplicateFixture(dup.id.clone()));
            }
            for b in &self.mappings[i + 1..] {
                if a.first() <= b.last() && b.first() <= a.last() {
                    return Err(BridgeError::OverlappingChannels {
                        first: a.id.clone(),
                        second: b.id.clone(),
                        start: a.first().max(b.first()),
                        end: a.last().min(b.last()),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, id: &FixtureId) -> Option<&ChannelMapping> {
        self.mappings.iter().find(|mapping| &mapping.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn channels_per_fixture(&self) -> u16 {
        self.channels_per_fixture
    }

    /// Inclusive range of channels used by all fixtures.
    pub fn channel_range(&self) -> Option<(u32, u32)> {
        let first = self.mappings.iter().map(ChannelMapping::first).min()?;
        let last = self.mappings.iter().map(ChannelMapping::last).max()?;
        Some((first, last))
    }
}
