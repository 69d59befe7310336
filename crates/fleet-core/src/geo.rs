//! Geographic position for map placement and marker animation

use serde::{Deserialize, Serialize};

/// Map position as a longitude/latitude pair
///
/// Ordering follows the map convention (`[lon, lat]`), which is also the
/// order coordinates arrive in on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Build a position from a wire coordinate slice `[lon, lat, ..]`
    pub fn from_coordinates(coords: &[f64]) -> Option<Self> {
        match coords {
            [lng, lat, ..] => Some(Self::new(*lng, *lat)),
            _ => None,
        }
    }

    /// Check if this position is within valid bounds
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Linear interpolation between two positions
    /// fraction: 0.0 = self, 1.0 = other
    pub fn interpolate(&self, other: &Position, fraction: f64) -> Position {
        let fraction = fraction.clamp(0.0, 1.0);

        Position::new(
            self.longitude + (other.longitude - self.longitude) * fraction,
            self.latitude + (other.latitude - self.latitude) * fraction,
        )
    }

    /// Convert to array [longitude, latitude]
    pub fn to_array(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}
