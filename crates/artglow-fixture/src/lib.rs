//! Async control of networked light fixtures.
//!
//! [`Fixture`] is the seam the bridge drives. Two implementations ship here:
//! - [`YeelightBulb`] speaks the Yeelight LAN protocol (JSON over TCP, with
//!   "music mode" as the low-latency streaming mode)
//! - [`RecordingFixture`] keeps commands in memory, for dry runs and tests

pub mod error;
pub mod recording;
pub mod traits;
pub mod yeelight;

pub use error::{FixtureError, Result};
pub use recording::{Command, FailureMode, RecordingFixture};
pub use traits::{Fixture, Rgb};
pub use yeelight::{normalize_address, YeelightBulb, YeelightConfig, DEFAULT_PORT};
