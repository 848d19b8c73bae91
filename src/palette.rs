// Color palettes for grouped aesthetics

use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Every built-in swatch has this many base colors.
pub const SWATCH_SIZE: usize = 6;

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Build from a 0xRRGGBB literal.
    pub const fn hex(value: u32) -> Self {
        Color {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    /// Linear blend in RGB space, `t` clamped to [0, 1].
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The eight hand-authored swatches, each ordered by hue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinPalette {
    Ocean,
    Sunset,
    Forest,
    Berry,
    Earth,
    Pastel,
    Vibrant,
    Grayscale,
}

impl BuiltinPalette {
    pub const ALL: [BuiltinPalette; 8] = [
        BuiltinPalette::Ocean,
        BuiltinPalette::Sunset,
        BuiltinPalette::Forest,
        BuiltinPalette::Berry,
        BuiltinPalette::Earth,
        BuiltinPalette::Pastel,
        BuiltinPalette::Vibrant,
        BuiltinPalette::Grayscale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinPalette::Ocean => "ocean",
            BuiltinPalette::Sunset => "sunset",
            BuiltinPalette::Forest => "forest",
            BuiltinPalette::Berry => "berry",
            BuiltinPalette::Earth => "earth",
            BuiltinPalette::Pastel => "pastel",
            BuiltinPalette::Vibrant => "vibrant",
            BuiltinPalette::Grayscale => "grayscale",
        }
    }

    /// Exact, case-sensitive lookup. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        BuiltinPalette::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn swatch(self) -> [Color; SWATCH_SIZE] {
        match self {
            BuiltinPalette::Ocean => [
                Color::hex(0x03045E),
                Color::hex(0x023E8A),
                Color::hex(0x0077B6),
                Color::hex(0x00B4D8),
                Color::hex(0x48CAE4),
                Color::hex(0x90E0EF),
            ],
            BuiltinPalette::Sunset => [
                Color::hex(0x355070),
                Color::hex(0x6D597A),
                Color::hex(0xB56576),
                Color::hex(0xE56B6F),
                Color::hex(0xEAAC8B),
                Color::hex(0xFFD166),
            ],
            BuiltinPalette::Forest => [
                Color::hex(0x081C15),
                Color::hex(0x1B4332),
                Color::hex(0x2D6A4F),
                Color::hex(0x40916C),
                Color::hex(0x74C69D),
                Color::hex(0xB7E4C7),
            ],
            BuiltinPalette::Berry => [
                Color::hex(0x3C096C),
                Color::hex(0x7B2CBF),
                Color::hex(0xC77DFF),
                Color::hex(0xE0AAFF),
                Color::hex(0xF72585),
                Color::hex(0xB5179E),
            ],
            BuiltinPalette::Earth => [
                Color::hex(0x582F0E),
                Color::hex(0x7F4F24),
                Color::hex(0x936639),
                Color::hex(0xA68A64),
                Color::hex(0xB6AD90),
                Color::hex(0x656D4A),
            ],
            BuiltinPalette::Pastel => [
                Color::hex(0xFFADAD),
                Color::hex(0xFFD6A5),
                Color::hex(0xFDFFB6),
                Color::hex(0xCAFFBF),
                Color::hex(0x9BF6FF),
                Color::hex(0xBDB2FF),
            ],
            BuiltinPalette::Vibrant => [
                Color::hex(0xE63946),
                Color::hex(0xF4A261),
                Color::hex(0xE9C46A),
                Color::hex(0x2A9D8F),
                Color::hex(0x457B9D),
                Color::hex(0x6A4C93),
            ],
            BuiltinPalette::Grayscale => [
                Color::hex(0x111111),
                Color::hex(0x3A3A3A),
                Color::hex(0x636363),
                Color::hex(0x8C8C8C),
                Color::hex(0xB5B5B5),
                Color::hex(0xDEDEDE),
            ],
        }
    }
}

/// Reference stops of the viridis color map, evenly spaced over [0, 1].
const VIRIDIS_STOPS: [Color; 9] = [
    Color::hex(0x440154),
    Color::hex(0x472D7B),
    Color::hex(0x3B528B),
    Color::hex(0x2C728E),
    Color::hex(0x21908C),
    Color::hex(0x27AD81),
    Color::hex(0x5DC863),
    Color::hex(0xAADC32),
    Color::hex(0xFDE725),
];

/// Sample `n` evenly spaced colors along a ramp through `stops`.
/// A single color is the first stop.
pub fn interpolate(stops: &[Color], n: usize) -> Vec<Color> {
    match (stops.len(), n) {
        (0, _) | (_, 0) => Vec::new(),
        (1, _) => vec![stops[0]; n],
        (_, 1) => vec![stops[0]],
        (len, n) => {
            let last = (len - 1) as f64;
            (0..n)
                .map(|i| {
                    let pos = i as f64 * last / (n - 1) as f64;
                    let lo = (pos.floor() as usize).min(len - 2);
                    stops[lo].lerp(stops[lo + 1], pos - lo as f64)
                })
                .collect()
        }
    }
}

/// Perceptually-uniform sequence of exactly `n` colors.
pub fn viridis(n: usize) -> Vec<Color> {
    interpolate(&VIRIDIS_STOPS, n)
}

/// Resolved palette for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: Vec<Color>,
}

impl ColorPalette {
    pub fn new(colors: Vec<Color>) -> Self {
        ColorPalette { colors }
    }

    /// A built-in swatch stretched to `max(group_count, 6)` colors.
    pub fn builtin(palette: BuiltinPalette, group_count: usize) -> Self {
        let n = group_count.max(SWATCH_SIZE);
        ColorPalette::new(interpolate(&palette.swatch(), n))
    }

    pub fn generated(group_count: usize) -> Self {
        ColorPalette::new(viridis(group_count))
    }

    /// A recognised name picks its swatch; anything else, including no
    /// name at all, falls back to the generated sequence.
    pub fn resolve(name: Option<&str>, group_count: usize) -> Self {
        match name.map(|n| (n, BuiltinPalette::from_name(n))) {
            Some((_, Some(builtin))) => ColorPalette::builtin(builtin, group_count),
            Some((unknown, None)) => {
                debug!(palette = unknown, "unrecognised palette name, using viridis");
                ColorPalette::generated(group_count)
            }
            None => ColorPalette::generated(group_count),
        }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn into_colors(self) -> Vec<Color> {
        self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn first(&self) -> Option<Color> {
        self.colors.first().copied()
    }
}
