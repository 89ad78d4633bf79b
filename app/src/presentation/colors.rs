//! Per-author display colors.
//!
//! A color is derived from a SHA-256 of the author name, mapped into a
//! hue/saturation/brightness range that stays readable on a dark
//! background, and cached on first lookup.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

const SATURATION: (f32, f32) = (0.55, 0.85);
const BRIGHTNESS: (f32, f32) = (0.80, 1.00);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{}", hex::encode([self.r, self.g, self.b]))
    }
}

/// Deterministic color for `author`.
pub fn derive_color(author: &str) -> Rgb {
    let digest = Sha256::digest(author.as_bytes());
    let hue = f32::from(u16::from_be_bytes([digest[0], digest[1]]) % 360);
    let saturation = lerp(SATURATION, f32::from(digest[2]) / 255.0);
    let brightness = lerp(BRIGHTNESS, f32::from(digest[3]) / 255.0);
    hsv_to_rgb(hue, saturation, brightness)
}

fn lerp((lo, hi): (f32, f32), t: f32) -> f32 {
    lo + (hi - lo) * t
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb {
        r: channel(r),
        g: channel(g),
        b: channel(b),
    }
}

/// Author-keyed color cache owned by a renderer.
#[derive(Debug, Default)]
pub struct ColorStore {
    colors: HashMap<String, Rgb>,
}

impl ColorStore {
    pub fn color_for(&mut self, author: &str) -> Rgb {
        if let Some(color) = self.colors.get(author) {
            return *color;
        }
        let color = derive_color(author);
        self.colors.insert(author.to_string(), color);
        color
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
