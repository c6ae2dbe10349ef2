//! Where broadcasts originate from.
//!
//! A terminal has no geolocation prompt, so the user's position comes from
//! the config file or the command line. When neither supplies one, every
//! broadcast is stamped with a random position instead.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude band used for random fallback positions. The poles are skipped
/// because markers there are hard to see on the globe.
pub const FALLBACK_LAT_RANGE: (f64, f64) = (-80.0, 80.0);
pub const FALLBACK_LNG_RANGE: (f64, f64) = (-180.0, 180.0);

const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}", self.lat, self.lng)
    }
}

pub fn fallback_coordinates<R: Rng + ?Sized>(rng: &mut R) -> Coordinates {
    Coordinates {
        lat: rng.gen_range(FALLBACK_LAT_RANGE.0..=FALLBACK_LAT_RANGE.1),
        lng: rng.gen_range(FALLBACK_LNG_RANGE.0..=FALLBACK_LNG_RANGE.1),
    }
}

/// Use the known location if there is one, otherwise a random position.
pub fn resolve_coordinates<R: Rng + ?Sized>(
    known: Option<Coordinates>,
    rng: &mut R,
) -> Coordinates {
    match known {
        Some(coords) => coords,
        None => fallback_coordinates(rng),
    }
}

/// Primary language subtag from the POSIX locale environment.
pub fn detect_language() -> String {
    let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty());

    language_from_locale(locale.as_deref())
}

/// `de_DE.UTF-8` becomes `de`, `pt-BR` becomes `pt`. `C` and `POSIX` carry no
/// language and fall back to English.
pub fn language_from_locale(locale: Option<&str>) -> String {
    let Some(locale) = locale else {
        return DEFAULT_LANGUAGE.to_string();
    };

    let primary = locale
        .split(['_', '-', '.', '@'])
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match primary.as_str() {
        "" | "c" | "posix" => DEFAULT_LANGUAGE.to_string(),
        _ => primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_known_location_wins() {
        let mut rng = StdRng::seed_from_u64(1);
        let home = Coordinates::new(51.5074, -0.1278);
        assert_eq!(resolve_coordinates(Some(home), &mut rng), home);
    }

    #[test]
    fn test_fallback_varies() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = resolve_coordinates(None, &mut rng);
        let b = resolve_coordinates(None, &mut rng);
        assert_ne!(a, b);
        assert!(a.is_valid() && b.is_valid());
    }

    #[test]
    fn test_language_from_locale() {
        assert_eq!(language_from_locale(Some("de_DE.UTF-8")), "de");
        assert_eq!(language_from_locale(Some("pt-BR")), "pt");
        assert_eq!(language_from_locale(Some("sr_RS@latin")), "sr");
        assert_eq!(language_from_locale(Some("ja")), "ja");
        assert_eq!(language_from_locale(Some("C.UTF-8")), "en");
        assert_eq!(language_from_locale(Some("POSIX")), "en");
        assert_eq!(language_from_locale(None), "en");
    }

    #[test]
    fn test_coordinates_display() {
        assert_eq!(Coordinates::new(40.71284, -74.00601).to_string(), "40.71, -74.01");
    }

    proptest! {
        #[test]
        fn fallback_stays_in_range(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let coords = resolve_coordinates(None, &mut rng);
            prop_assert!((-80.0..=80.0).contains(&coords.lat));
            prop_assert!((-180.0..=180.0).contains(&coords.lng));
        }
    }
}
