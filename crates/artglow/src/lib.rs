//! Drive networked light fixtures from an Art-Net DMX stream.
//!
//! A lighting console sends DMX frames over UDP; artglow decodes them, cuts
//! each fixture's channels out of the frame and keeps every fixture close to
//! the latest state without letting a slow fixture hold up the stream.
//!
//! # Crate Structure
//!
//! - [`transport`]: Art-Net UDP receive/send and packet prefix parsing
//! - [`frame`]: ArtDmx header decoding and encoding
//! - [`fixture`]: the [`Fixture`](fixture::Fixture) trait and its
//!   implementations
//! - [`bridge`]: channel map, per-fixture workers and bridge lifecycle

/// Re-export transport types.
pub mod transport {
    pub use artglow_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use artglow_frame::*;
}

/// Re-export fixture types.
pub mod fixture {
    pub use artglow_fixture::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use artglow_bridge::*;
}
