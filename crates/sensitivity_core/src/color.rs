//! Named colour maps and the gradient scale used by tables and plots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Luminance below which cell text switches to a light colour
pub const TEXT_COLOR_THRESHOLD: f64 = 0.408;

/// An 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const LIGHT: Rgb = Rgb::new(0xf1, 0xf1, 0xf1);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn hex(value: u32) -> Self {
        Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// WCAG relative luminance in [0, 1]
    pub fn relative_luminance(self) -> f64 {
        let linear = |c: u8| {
            let x = f64::from(c) / 255.0;
            if x <= 0.04045 {
                x / 12.92
            } else {
                ((x + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    /// Readable text colour on this background
    pub fn text_color(self) -> Rgb {
        if self.relative_luminance() < TEXT_COLOR_THRESHOLD {
            Rgb::LIGHT
        } else {
            Rgb::BLACK
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Named colour maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMap {
    /// Red (low) through yellow to green (high)
    #[default]
    RdYlGn,
    RdYlBu,
    RdBu,
    Spectral,
    Coolwarm,
    Viridis,
    Plasma,
    Greens,
    Reds,
    Blues,
    Greys,
}

impl ColorMap {
    pub const ALL: [ColorMap; 11] = [
        ColorMap::RdYlGn,
        ColorMap::RdYlBu,
        ColorMap::RdBu,
        ColorMap::Spectral,
        ColorMap::Coolwarm,
        ColorMap::Viridis,
        ColorMap::Plasma,
        ColorMap::Greens,
        ColorMap::Reds,
        ColorMap::Blues,
        ColorMap::Greys,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorMap::RdYlGn => "RdYlGn",
            ColorMap::RdYlBu => "RdYlBu",
            ColorMap::RdBu => "RdBu",
            ColorMap::Spectral => "Spectral",
            ColorMap::Coolwarm => "coolwarm",
            ColorMap::Viridis => "viridis",
            ColorMap::Plasma => "plasma",
            ColorMap::Greens => "Greens",
            ColorMap::Reds => "Reds",
            ColorMap::Blues => "Blues",
            ColorMap::Greys => "Greys",
        }
    }

    /// Evenly spaced anchor colours from 0 to 1
    fn stops(self) -> &'static [Rgb] {
        const RD_YL_GN: [Rgb; 11] = [
            Rgb::hex(0xa50026),
            Rgb::hex(0xd73027),
            Rgb::hex(0xf46d43),
            Rgb::hex(0xfdae61),
            Rgb::hex(0xfee08b),
            Rgb::hex(0xffffbf),
            Rgb::hex(0xd9ef8b),
            Rgb::hex(0xa6d96a),
            Rgb::hex(0x66bd63),
            Rgb::hex(0x1a9850),
            Rgb::hex(0x006837),
        ];
        const RD_YL_BU: [Rgb; 11] = [
            Rgb::hex(0xa50026),
            Rgb::hex(0xd73027),
            Rgb::hex(0xf46d43),
            Rgb::hex(0xfdae61),
            Rgb::hex(0xfee090),
            Rgb::hex(0xffffbf),
            Rgb::hex(0xe0f3f8),
            Rgb::hex(0xabd9e9),
            Rgb::hex(0x74add1),
            Rgb::hex(0x4575b4),
            Rgb::hex(0x313695),
        ];
        const RD_BU: [Rgb; 11] = [
            Rgb::hex(0x67001f),
            Rgb::hex(0xb2182b),
            Rgb::hex(0xd6604d),
            Rgb::hex(0xf4a582),
            Rgb::hex(0xfddbc7),
            Rgb::hex(0xf7f7f7),
            Rgb::hex(0xd1e5f0),
            Rgb::hex(0x92c5de),
            Rgb::hex(0x4393c3),
            Rgb::hex(0x2166ac),
            Rgb::hex(0x053061),
        ];
        const SPECTRAL: [Rgb; 11] = [
            Rgb::hex(0x9e0142),
            Rgb::hex(0xd53e4f),
            Rgb::hex(0xf46d43),
            Rgb::hex(0xfdae61),
            Rgb::hex(0xfee08b),
            Rgb::hex(0xffffbf),
            Rgb::hex(0xe6f598),
            Rgb::hex(0xabdda4),
            Rgb::hex(0x66c2a5),
            Rgb::hex(0x3288bd),
            Rgb::hex(0x5e4fa2),
        ];
        const COOLWARM: [Rgb; 5] = [
            Rgb::hex(0x3b4cc0),
            Rgb::hex(0x8db0fe),
            Rgb::hex(0xdddddd),
            Rgb::hex(0xf49a7b),
            Rgb::hex(0xb40426),
        ];
        const VIRIDIS: [Rgb; 10] = [
            Rgb::hex(0x440154),
            Rgb::hex(0x482878),
            Rgb::hex(0x3e4a89),
            Rgb::hex(0x31688e),
            Rgb::hex(0x26828e),
            Rgb::hex(0x1f9e89),
            Rgb::hex(0x35b779),
            Rgb::hex(0x6ece58),
            Rgb::hex(0xb5de2b),
            Rgb::hex(0xfde725),
        ];
        const PLASMA: [Rgb; 10] = [
            Rgb::hex(0x0d0887),
            Rgb::hex(0x47039f),
            Rgb::hex(0x7301a8),
            Rgb::hex(0x9c179e),
            Rgb::hex(0xbd3786),
            Rgb::hex(0xd8576b),
            Rgb::hex(0xed7953),
            Rgb::hex(0xfa9e3b),
            Rgb::hex(0xfdc926),
            Rgb::hex(0xf0f921),
        ];
        const GREENS: [Rgb; 9] = [
            Rgb::hex(0xf7fcf5),
            Rgb::hex(0xe5f5e0),
            Rgb::hex(0xc7e9c0),
            Rgb::hex(0xa1d99b),
            Rgb::hex(0x74c476),
            Rgb::hex(0x41ab5d),
            Rgb::hex(0x238b45),
            Rgb::hex(0x006d2c),
            Rgb::hex(0x00441b),
        ];
        const REDS: [Rgb; 9] = [
            Rgb::hex(0xfff5f0),
            Rgb::hex(0xfee0d2),
            Rgb::hex(0xfcbba1),
            Rgb::hex(0xfc9272),
            Rgb::hex(0xfb6a4a),
            Rgb::hex(0xef3b2c),
            Rgb::hex(0xcb181d),
            Rgb::hex(0xa50f15),
            Rgb::hex(0x67000d),
        ];
        const BLUES: [Rgb; 9] = [
            Rgb::hex(0xf7fbff),
            Rgb::hex(0xdeebf7),
            Rgb::hex(0xc6dbef),
            Rgb::hex(0x9ecae1),
            Rgb::hex(0x6baed6),
            Rgb::hex(0x4292c6),
            Rgb::hex(0x2171b5),
            Rgb::hex(0x08519c),
            Rgb::hex(0x08306b),
        ];
        const GREYS: [Rgb; 9] = [
            Rgb::hex(0xffffff),
            Rgb::hex(0xf0f0f0),
            Rgb::hex(0xd9d9d9),
            Rgb::hex(0xbdbdbd),
            Rgb::hex(0x969696),
            Rgb::hex(0x737373),
            Rgb::hex(0x525252),
            Rgb::hex(0x252525),
            Rgb::hex(0x000000),
        ];

        match self {
            ColorMap::RdYlGn => &RD_YL_GN,
            ColorMap::RdYlBu => &RD_YL_BU,
            ColorMap::RdBu => &RD_BU,
            ColorMap::Spectral => &SPECTRAL,
            ColorMap::Coolwarm => &COOLWARM,
            ColorMap::Viridis => &VIRIDIS,
            ColorMap::Plasma => &PLASMA,
            ColorMap::Greens => &GREENS,
            ColorMap::Reds => &REDS,
            ColorMap::Blues => &BLUES,
            ColorMap::Greys => &GREYS,
        }
    }

    /// Colour at position `t` (clamped to [0, 1]; NaN maps to 0)
    pub fn sample(self, t: f64) -> Rgb {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let scaled = t * (stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(stops.len() - 2);
        stops[lower].lerp(stops[lower + 1], scaled - lower as f64)
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognised colour map name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color map '{0}'")]
pub struct UnknownColorMap(pub String);

impl FromStr for ColorMap {
    type Err = UnknownColorMap;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ColorMap::ALL
            .into_iter()
            .find(|map| map.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownColorMap(s.to_string()))
    }
}

impl Serialize for ColorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ColorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A colour map with an optional reversal, mapping values to colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorScale {
    pub map: ColorMap,
    pub reversed: bool,
}

impl ColorScale {
    pub fn new(map: ColorMap, reversed: bool) -> Self {
        Self { map, reversed }
    }

    /// Combine a map name (which may carry an `_r` suffix) with the
    /// reverse-colours flag; the two reversals cancel out.
    pub fn from_name(name: &str, reverse_colors: bool) -> Result<Self, UnknownColorMap> {
        let (base, suffix_reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        Ok(Self::new(base.parse()?, suffix_reversed != reverse_colors))
    }

    /// Colour at position `t` in [0, 1]
    pub fn color_at(&self, t: f64) -> Rgb {
        if self.reversed {
            self.map.sample(1.0 - t)
        } else {
            self.map.sample(t)
        }
    }

    /// Colour for `value` scaled linearly between `min` and `max`.
    /// A degenerate range maps every value to the low end.
    pub fn color_for(&self, value: f64, min: f64, max: f64) -> Rgb {
        self.color_at(normalize(value, min, max))
    }

    /// Name as understood by [`ColorScale::from_name`]
    pub fn name(&self) -> String {
        if self.reversed {
            format!("{}_r", self.map.name())
        } else {
            self.map.name().to_string()
        }
    }
}

/// Position of `value` within [min, max]. Infinite values sit at the ends.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if value == f64::INFINITY {
        return 1.0;
    }
    if value == f64::NEG_INFINITY {
        return 0.0;
    }
    let range = max - min;
    if range > 0.0 && range.is_finite() {
        ((value - min) / range).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Smallest and largest finite value; `None` if there is none
pub fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(ColorMap::RdYlGn.sample(0.0), Rgb::hex(0xa50026));
        assert_eq!(ColorMap::RdYlGn.sample(1.0), Rgb::hex(0x006837));
        assert_eq!(ColorMap::RdYlGn.sample(0.5), Rgb::hex(0xffffbf));
        assert_eq!(ColorMap::Greys.sample(2.0), Rgb::BLACK);
    }

    #[test]
    fn test_interpolation_between_stops() {
        // Halfway between white and #f0f0f0
        assert_eq!(ColorMap::Greys.sample(1.0 / 16.0), Rgb::new(0xf8, 0xf8, 0xf8));
    }

    #[test]
    fn test_reverse_swaps_endpoints() {
        let scale = ColorScale::new(ColorMap::RdYlGn, true);
        assert_eq!(scale.color_at(0.0), Rgb::hex(0x006837));
        assert_eq!(scale.color_at(1.0), Rgb::hex(0xa50026));
    }

    #[test]
    fn test_from_name_with_suffix() {
        let scale = ColorScale::from_name("coolwarm_r", false).unwrap();
        assert_eq!(scale.map, ColorMap::Coolwarm);
        assert!(scale.reversed);

        let scale = ColorScale::from_name("coolwarm_r", true).unwrap();
        assert!(!scale.reversed);

        assert!(ColorScale::from_name("jet", false).is_err());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("rdylgn".parse::<ColorMap>(), Ok(ColorMap::RdYlGn));
        assert_eq!("Viridis".parse::<ColorMap>(), Ok(ColorMap::Viridis));
    }

    #[test]
    fn test_color_for_degenerate_range() {
        let scale = ColorScale::default();
        assert_eq!(scale.color_for(5.0, 5.0, 5.0), ColorMap::RdYlGn.sample(0.0));
    }

    #[test]
    fn test_infinite_values_sit_at_the_ends() {
        assert_eq!(normalize(f64::INFINITY, 1.0, 2.0), 1.0);
        assert_eq!(normalize(f64::NEG_INFINITY, 1.0, 2.0), 0.0);
        assert_eq!(normalize(f64::INFINITY, 3.0, 3.0), 1.0);
        assert_eq!(finite_range([f64::INFINITY, 2.0, f64::NAN, -1.0]), Some((-1.0, 2.0)));
        assert_eq!(finite_range([f64::INFINITY, f64::NAN]), None);
    }

    #[test]
    fn test_text_color() {
        assert_eq!(Rgb::BLACK.text_color(), Rgb::LIGHT);
        assert_eq!(Rgb::new(255, 255, 255).text_color(), Rgb::BLACK);
        assert_eq!(ColorMap::RdYlGn.sample(0.5).text_color(), Rgb::BLACK);
    }

    #[test]
    fn test_hex() {
        assert_eq!(Rgb::new(255, 0, 16).to_hex(), "#ff0010");
    }
}
