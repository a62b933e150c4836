use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// An RGB color, one byte per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Packed `0xRRGGBB` form.
    pub fn to_u32(self) -> u32 {
        (u32::from(self.red) << 16) | (u32::from(self.green) << 8) | u32::from(self.blue)
    }
}

/// A networked light whose power, color and brightness are set by async commands.
///
/// Methods take `&self` so one handle can be shared between the worker that
/// streams state and the controller that owns startup and shutdown.
pub trait Fixture: Send + Sync + 'static {
    /// Open the control connection.
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Switch the light on.
    fn turn_on(&self) -> impl Future<Output = Result<()>> + Send;

    /// Switch the light off.
    fn turn_off(&self) -> impl Future<Output = Result<()>> + Send;

    /// Enter the low-latency mode used for rapid successive updates.
    fn start_streaming(&self) -> impl Future<Output = Result<()>> + Send;

    /// Leave streaming mode.
    fn stop_streaming(&self) -> impl Future<Output = Result<()>> + Send;

    /// Set the color, fading over `transition` (zero for an instant change).
    fn set_color(&self, color: Rgb, transition: Duration)
        -> impl Future<Output = Result<()>> + Send;

    /// Set brightness in percent (0-100), fading over `transition`.
    fn set_brightness(
        &self,
        percent: u8,
        transition: Duration,
    ) -> impl Future<Output = Result<()>> + Send;
}
