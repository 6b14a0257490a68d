//! Geographic primitives shared by stops, pickup points and routing

/// WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Canonical `"lat,lng"` form with 6 decimals (~0.1 m), used as cache key
    /// component and provider coordinate string.
    pub fn canonical(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Great-circle distance in meters (haversine).
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

// ── Tests ──────────────────────────────────────────────────────
