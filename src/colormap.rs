//! Sequential colour maps and class-to-colour lookup.

/// A single color stop in a colormap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// Position in 0..=1
    pub position: f64,
    pub color: [u8; 3],
}

/// Piecewise-linear colour map over 0..=1.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    pub name: &'static str,
    stops: Vec<ColorStop>,
}

const REDS: [&str; 9] = [
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15",
    "#67000d",
];

impl Colormap {
    /// Builds a colour map from evenly spaced colours.
    pub fn evenly_spaced(name: &'static str, colors: &[[u8; 3]]) -> Self {
        let n = colors.len().max(2) - 1;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, color)| ColorStop {
                position: i as f64 / n as f64,
                color: *color,
            })
            .collect();
        Self { name, stops }
    }

    /// ColorBrewer sequential reds, light to dark.
    pub fn reds() -> Self {
        let colors: Vec<[u8; 3]> = REDS.iter().filter_map(|hex| parse_hex_color(hex)).collect();
        Self::evenly_spaced("Reds", &colors)
    }

    /// Reversed "hot": white through yellow and red to black.
    pub fn hot_r() -> Self {
        Self {
            name: "hot_r",
            stops: vec![
                ColorStop { position: 0.0, color: [255, 255, 255] },
                ColorStop { position: 0.254, color: [255, 255, 0] },
                ColorStop { position: 0.635, color: [255, 0, 0] },
                ColorStop { position: 1.0, color: [11, 0, 0] },
            ],
        }
    }

    /// Interpolate a color at position t ∈ [0, 1]
    pub fn interpolate(&self, t: f64) -> [u8; 3] {
        let Some(first) = self.stops.first() else {
            return [128, 128, 128];
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        let upper = self.stops.partition_point(|s| s.position < t);
        if upper == 0 {
            return first.color;
        }
        let Some(hi) = self.stops.get(upper) else {
            return self.stops[self.stops.len() - 1].color;
        };
        let lo = &self.stops[upper - 1];

        let span = hi.position - lo.position;
        let frac = if span > 0.0 { (t - lo.position) / span } else { 0.0 };
        [
            lerp(lo.color[0], hi.color[0], frac),
            lerp(lo.color[1], hi.color[1], frac),
            lerp(lo.color[2], hi.color[2], frac),
        ]
    }

    /// Colour of class `k` when the classes in use run from `lowest` to
    /// `highest`: the lowest present class takes the start of the map and
    /// the highest the end, so an empty top class shifts every shade.
    pub fn class_color(&self, k: usize, lowest: usize, highest: usize) -> [u8; 3] {
        if highest <= lowest {
            return self.interpolate(0.0);
        }
        self.interpolate(k.saturating_sub(lowest) as f64 / (highest - lowest) as f64)
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

/// Parse hex color string to RGB array
fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
