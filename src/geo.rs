use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Radius of the globe in scene units. Marker sizes and camera distances are
/// expressed relative to this.
pub const GLOBE_RADIUS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Rotate around the vertical (y) axis, right-handed.
    pub fn rotate_y(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos + self.z * sin,
            self.y,
            -self.x * sin + self.z * cos,
        )
    }
}

/// Convert a latitude/longitude pair in degrees to a point on a sphere.
///
/// The axes follow the scene convention: `y` points to the north pole and
/// the camera looks down the negative `z` axis.
pub fn lat_long_to_vector3(lat: f64, lng: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lng + 180.0).to_radians();

    let x = -(radius * phi.sin() * theta.cos());
    let z = radius * phi.sin() * theta.sin();
    let y = radius * phi.cos();

    Vec3::new(x, y, z)
}

/// An sRGB colour parsed from or printed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn hex(value: u32) -> Self {
        Self((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Scale brightness, saturating at white.
    pub fn brighten(self, factor: f64) -> Self {
        let scale = |c: u8| (c as f64 * factor).round().clamp(0.0, 255.0) as u8;
        Self(scale(self.0), scale(self.1), scale(self.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(format!("expected #rrggbb, got {:?}", s));
        }
        u32::from_str_radix(digits, 16)
            .map(Rgb::hex)
            .map_err(|e| format!("invalid colour {:?}: {}", s, e))
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }
}

pub const FEAR_COLOR: Rgb = Rgb::hex(0xef4444);
pub const ANGER_COLOR: Rgb = Rgb::hex(0xf97316);
pub const JOY_COLOR: Rgb = Rgb::hex(0x22c55e);
pub const ANTICIPATION_COLOR: Rgb = Rgb::hex(0x3b82f6);
pub const SADNESS_COLOR: Rgb = Rgb::hex(0x6366f1);
pub const NEUTRAL_COLOR: Rgb = Rgb::hex(0xcbd5e1);

/// Marker colour for a sentiment label. Unknown labels get the neutral slate.
pub fn sentiment_color(sentiment: &str) -> Rgb {
    match sentiment.to_lowercase().as_str() {
        "fear" => FEAR_COLOR,
        "anger" => ANGER_COLOR,
        "joy" => JOY_COLOR,
        "anticipation" => ANTICIPATION_COLOR,
        "sadness" => SADNESS_COLOR,
        _ => NEUTRAL_COLOR,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    Fear,
    Anger,
    Joy,
    Anticipation,
    Sadness,
    Other(String),
}

impl Sentiment {
    pub fn as_str(&self) -> &str {
        match self {
            Sentiment::Fear => "fear",
            Sentiment::Anger => "anger",
            Sentiment::Joy => "joy",
            Sentiment::Anticipation => "anticipation",
            Sentiment::Sadness => "sadness",
            Sentiment::Other(label) => label,
        }
    }

    pub fn color(&self) -> Rgb {
        sentiment_color(self.as_str())
    }
}

impl From<String> for Sentiment {
    fn from(label: String) -> Self {
        match label.to_lowercase().as_str() {
            "fear" => Sentiment::Fear,
            "anger" => Sentiment::Anger,
            "joy" => Sentiment::Joy,
            "anticipation" => Sentiment::Anticipation,
            "sadness" => Sentiment::Sadness,
            _ => Sentiment::Other(label),
        }
    }
}

impl From<Sentiment> for String {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.as_str().to_string()
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
