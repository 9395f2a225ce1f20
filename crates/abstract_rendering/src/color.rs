//! RGBA colors, the usual output type of a transfer pass.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub const CLEAR: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const PINK: Color = Color::rgb(255, 175, 175);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Linear blend, `t` clamped to `[0, 1]`.
    pub fn lerp(low: Color, high: Color, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color {
            r: mix(low.r, high.r),
            g: mix(low.g, high.g),
            b: mix(low.b, high.b),
            a: mix(low.a, high.a),
        }
    }

    /// Perceived brightness in `[0, 1]`, alpha-weighted against white.
    pub fn luminance(&self) -> f64 {
        let alpha = self.a as f64 / 255.0;
        let over_white = |c: u8| (c as f64 / 255.0) * alpha + (1.0 - alpha);
        0.2126 * over_white(self.r) + 0.7152 * over_white(self.g) + 0.0722 * over_white(self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::CLEAR
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints_and_clamp() {
        assert_eq!(Color::lerp(Color::PINK, Color::RED, 0.0), Color::PINK);
        assert_eq!(Color::lerp(Color::PINK, Color::RED, 1.0), Color::RED);
        assert_eq!(Color::lerp(Color::PINK, Color::RED, 7.0), Color::RED);
        assert_eq!(Color::lerp(Color::BLACK, Color::WHITE, 0.5), Color::rgb(128, 128, 128));
    }

    #[test]
    fn test_luminance_ordering() {
        assert!(Color::BLACK.luminance() < Color::RED.luminance());
        assert!((Color::CLEAR.luminance() - 1.0).abs() < 1e-9);
    }
}
