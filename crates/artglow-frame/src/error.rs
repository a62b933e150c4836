/// Errors that can occur during ArtDmx encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload is shorter than the ArtDmx header.
    #[error("malformed frame ({len} bytes, header needs {min})")]
    Malformed { len: usize, min: usize },

    /// More channel values than a DMX universe holds.
    #[error("too many channels ({count}, max {max})")]
    TooManyChannels { count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
