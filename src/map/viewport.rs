//! Map viewport: center, integer zoom, and the visible bounding box.
//!
//! Bounds are either supplied by the map widget as-is or derived from a
//! center point and a pixel size using spherical Web Mercator with 256px
//! tiles, which is what slippy-map widgets report for the same view.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod tests;

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Latitude limit of the square Web Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

const TILE_SIZE: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Geographic extent in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south && point.lat <= self.north && point.lon >= self.west && point.lon <= self.east
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        LatLng::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

/// The visible map window. Long-lived: one per map session, replaced
/// wholesale on every pan/zoom tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    pub bounds: Bounds,
}

impl Viewport {
    #[must_use]
    pub const fn new(center: LatLng, zoom: u8, bounds: Bounds) -> Self {
        Self { center, zoom, bounds }
    }

    /// Derive the viewport a `width_px` x `height_px` map shows when
    /// centered on `center` at `zoom`.
    ///
    /// Latitude is clamped to the Mercator limit. Horizontal extent is not
    /// wrapped, so a very wide view may report longitudes beyond ±180.
    #[must_use]
    pub fn from_center(center: LatLng, zoom: u8, width_px: u32, height_px: u32) -> Self {
        let center = LatLng::new(center.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT), center.lon);
        let world = world_size(zoom);
        let (cx, cy) = project(center, world);
        let half_w = f64::from(width_px.max(1)) / 2.0;
        let half_h = f64::from(height_px.max(1)) / 2.0;

        let north_west = unproject(cx - half_w, (cy - half_h).max(0.0), world);
        let south_east = unproject(cx + half_w, (cy + half_h).min(world), world);

        Self {
            center,
            zoom,
            bounds: Bounds::new(north_west.lon, south_east.lat, south_east.lon, north_west.lat),
        }
    }
}

fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * 2_f64.powi(i32::from(zoom))
}

/// Lat/lon to world pixel coordinates at the given world size.
fn project(point: LatLng, world: f64) -> (f64, f64) {
    let x = (point.lon + 180.0) / 360.0 * world;
    let sin = point.lat.to_radians().sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * world;
    (x, y)
}

fn unproject(x: f64, y: f64, world: f64) -> LatLng {
    let lon = x / world * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / world);
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lon)
}
