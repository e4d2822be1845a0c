//! Color schemes and multi-stop interpolation

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// 10 distinct categorical colors
    Tab10,
    /// Brown -> Yellow -> Green
    Ndvi,
}

impl ColorScheme {
    pub const ALL: &[ColorScheme] = &[Self::Tab10, Self::Ndvi];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tab10 => "tab10",
            Self::Ndvi => "NDVI",
        }
    }

    /// Whether the scheme is a discrete palette
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Tab10)
    }
}

const NDVI_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

/// Categorical palette; over a [0, 9] range value `k` gets color `k`.
const TAB10_PALETTE: &[Rgb] = &[
    Rgb::new(31, 119, 180),  // blue
    Rgb::new(255, 127, 14),  // orange
    Rgb::new(44, 160, 44),   // green
    Rgb::new(214, 39, 40),   // red
    Rgb::new(148, 103, 189), // purple
    Rgb::new(140, 86, 75),   // brown
    Rgb::new(227, 119, 194), // pink
    Rgb::new(127, 127, 127), // gray
    Rgb::new(188, 189, 34),  // olive
    Rgb::new(23, 190, 207),  // cyan
];

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

fn discrete(palette: &[Rgb], t: f64) -> Rgb {
    let n = palette.len();
    let idx = (t * n as f64).floor().clamp(0.0, (n - 1) as f64) as usize;
    palette[idx]
}

/// Evaluate a color scheme at normalized position `t` in [0, 1].
///
/// `Tab10` maps `t` to one of 10 bins; `Ndvi` interpolates between stops.
/// Out-of-range positions clamp to the end colors.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    match scheme {
        ColorScheme::Tab10 => discrete(TAB10_PALETTE, t),
        ColorScheme::Ndvi => multi_stop(NDVI_STOPS, t),
    }
}
