//! Channel-to-fixture dispatch engine.
//!
//! Decoded ArtDmx frames are cut into per-fixture states through a static
//! [`ChannelMap`]; each state is handed to that fixture's [`Dispatcher`], a
//! single-slot mailbox drained by a dedicated rate-limited worker. A slow or
//! failing fixture only ever delays itself.

pub mod channel_map;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod state;

pub use channel_map::{ChannelMap, ChannelMapping, FixtureId, DEFAULT_CHANNELS_PER_FIXTURE};
pub use controller::{BridgeConfig, BridgeController, FixtureEntry, FrameCounters};
pub use dispatcher::{DispatchConfig, Dispatcher, Submit};
pub use error::{BridgeError, Result};
pub use state::{brightness_percent, FixtureState};
