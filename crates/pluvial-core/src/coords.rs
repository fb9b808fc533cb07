/// Geographic bounding boxes.
/// All coordinate math uses f64, degrees of longitude/latitude.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Latitude of the tropics of Cancer and Capricorn.
pub const TROPIC_LAT: f64 = 23.4393;

/// An axis-aligned lon/lat rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Extent {
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self { min_lon, max_lon, min_lat, max_lat }
    }

    /// The whole globe.
    pub fn global() -> Self {
        Self::new(-180.0, 180.0, -90.0, 90.0)
    }

    /// The tropical belt, full longitude range.
    pub fn tropics() -> Self {
        Self::new(-180.0, 180.0, -TROPIC_LAT, TROPIC_LAT)
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True when min < max on both axes.
    pub fn is_valid(&self) -> bool {
        self.min_lon < self.max_lon && self.min_lat < self.max_lat
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Open-interval overlap test; rectangles that only touch do not intersect.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
            && self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
    }

    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }
        Some(Extent::new(
            self.min_lon.max(other.min_lon),
            self.max_lon.min(other.max_lon),
            self.min_lat.max(other.min_lat),
            self.max_lat.min(other.max_lat),
        ))
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::tropics()
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[lon {}..{}, lat {}..{}]",
            self.min_lon, self.max_lon, self.min_lat, self.max_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tropics_sits_inside_globe() {
        let t = Extent::tropics();
        let g = Extent::global();
        assert_eq!(g.intersection(&t), Some(t));
        assert!(t.contains(0.0, 0.0));
        assert!(!t.contains(0.0, 30.0));
    }

    #[test]
    fn touching_extents_do_not_intersect() {
        let a = Extent::new(0.0, 10.0, 0.0, 10.0);
        let b = Extent::new(10.0, 20.0, 0.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn intersection_is_clipped() {
        let a = Extent::new(0.0, 10.0, -5.0, 5.0);
        let b = Extent::new(5.0, 15.0, 0.0, 20.0);
        assert_eq!(a.intersection(&b), Some(Extent::new(5.0, 10.0, 0.0, 5.0)));
    }

    #[test]
    fn inverted_extent_is_invalid() {
        assert!(!Extent::new(10.0, 0.0, 0.0, 1.0).is_valid());
        assert!(Extent::tropics().is_valid());
    }
}
