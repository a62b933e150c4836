use artglow_fixture::Rgb;

/// Raw per-frame values for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureState {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Raw brightness channel value (0-255).
    pub brightness: u8,
}

impl FixtureState {
    pub fn color(&self) -> Rgb {
        Rgb::new(self.red, self.green, self.blue)
    }

    /// Brightness as the percentage sent to the fixture.
    pub fn brightness_percent(&self) -> u8 {
        brightness_percent(self.brightness)
    }
}

/// Scale a brightness channel value to 0-100 percent.
///
/// Divides by 256 and truncates, so full scale (255) maps to 99 rather than
/// 100.
pub fn brightness_percent(raw: u8) -> u8 {
    let percent = u32::from(raw) * 100 / 256;
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_scale() {
        assert_eq!(brightness_percent(0), 0);
        assert_eq!(brightness_percent(2), 0);
        assert_eq!(brightness_percent(3), 1);
        assert_eq!(brightness_percent(128), 50);
        assert_eq!(brightness_percent(255), 99);
    }

    #[test]
    fn brightness_never_exceeds_one_hundred() {
        assert!((0..=u8::MAX).all(|raw| brightness_percent(raw) <= 100));
    }

    #[test]
    fn color_view() {
        let state = FixtureState {
            red: 1,
            green: 2,
            blue: 3,
            brightness: 128,
        };
        assert_eq!(state.color(), Rgb::new(1, 2, 3));
        assert_eq!(state.brightness_percent(), 50);
    }
}
